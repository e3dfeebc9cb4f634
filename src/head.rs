pub mod anchor_head_single;
pub mod anchor_template;
pub mod cls_loss;
pub mod conv1x1;
pub mod focal_loss;

pub use anchor_head_single::*;
pub use anchor_template::*;
pub use conv1x1::*;
pub use focal_loss::*;
