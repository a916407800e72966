mod skills;

pub use skills::{clamp_score, display_skill_name, skill_overlap_score};
