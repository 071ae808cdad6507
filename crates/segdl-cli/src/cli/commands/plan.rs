//! `segdl plan` – print the segment table for a size.

use segdl_core::segmenter::plan_segments;

pub fn run_plan(size: u64, workers: usize) {
    print!("{}", table(size, workers));
}

pub(crate) fn table(size: u64, workers: usize) -> String {
    let mut out = format!("{:<6} {:>14} {:>14} {:>12} {:>12}\n", "SEG", "START", "END", "LEN", "TARGET");
    for s in plan_segments(size, workers) {
        out.push_str(&format!(
            "{:<6} {:>14} {:>14} {:>12} {:>12}\n",
            s.index,
            s.start,
            s.end,
            s.len(),
            s.target_len(size)
        ));
    }
    out
}
