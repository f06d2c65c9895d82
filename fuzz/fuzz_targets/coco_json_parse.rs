//! Fuzz target for COCO JSON parsing and the passes that follow it.
//!
//! Run with:
//!   cargo +nightly fuzz run coco_json_parse

#![no_main]

use cocolens::graph::CoOccurrenceGraph;
use cocolens::index::AnnotationIndex;
use cocolens::ir::io_coco_json::from_coco_slice;
use cocolens::spatial::{SpatialGrid, SpatialOptions};
use cocolens::stats::StatAggregator;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    // Parse errors are fine; panics in parsing or aggregation are not.
    let Ok(dataset) = from_coco_slice(data) else {
        return;
    };
    let index = AnnotationIndex::build(&dataset);
    let stats = StatAggregator::run(&index);
    let table = stats.summaries();
    let _ = SpatialGrid::build(&index, &table, &SpatialOptions::default());
    let _ = CoOccurrenceGraph::build(&index);
});
