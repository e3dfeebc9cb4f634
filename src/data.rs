mod anchor_targets;
mod batch_dict;
mod feature_map;
mod forward_ret;
mod tb_dict;
mod time_calc;

pub use anchor_targets::AnchorTargets;
pub use batch_dict::BatchDict;
pub use feature_map::FeatureMap;
pub use forward_ret::ForwardRet;
pub use tb_dict::TbDict;
pub use time_calc::TimeCalc;
