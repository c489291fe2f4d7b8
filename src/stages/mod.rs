pub mod stage0_bill_pool;
pub mod stage1_candidates;
pub mod stage2_classify;
pub mod stage3_segments;
pub mod stage4_annotate;

pub use stage0_bill_pool::*;
pub use stage1_candidates::*;
pub use stage2_classify::*;
pub use stage3_segments::*;
pub use stage4_annotate::*;
