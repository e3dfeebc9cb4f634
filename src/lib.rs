mod utils;
pub mod common;
pub mod data;
pub mod head;

use std::time::{Duration, Instant};

use crate::common::HeadOptions;
use crate::data::{BatchDict, TbDict};
use crate::head::{AnchorHeadSingle, AnchorTemplate};

pub fn init_head<T: AnchorTemplate>(options: HeadOptions, template: T) -> anyhow::Result<AnchorHeadSingle<T>> {
    log::info!(
        "Initializing anchor head ({} input channels, classes {:?})",
        options.input_channels,
        options.num_class,
    );
    AnchorHeadSingle::new(options, template)
}

pub fn run_head<T: AnchorTemplate>(head: &mut AnchorHeadSingle<T>, batch_dict: BatchDict) -> anyhow::Result<BatchDict> {
    let now = Instant::now();

    let batch_dict = head.forward(batch_dict)?;

    log::debug!("Head forward time: {:?}", now.elapsed());

    Ok(batch_dict)
}

/// Forward pass in training mode followed by the full head loss.
pub fn run_training_step<T: AnchorTemplate>(
    head: &mut AnchorHeadSingle<T>,
    batch_dict: BatchDict,
) -> anyhow::Result<(BatchDict, f32, TbDict)> {
    let start = Instant::now();
    let mut elapsed = Duration::ZERO;

    head.train();
    let batch_dict = head.forward(batch_dict)?;
    elapsed = utils::trace("TIME", "Head forward", start, elapsed);

    let (loss, tb_dict) = head.get_loss()?;
    utils::trace("TIME", "Head loss", start, elapsed);

    Ok((batch_dict, loss, tb_dict))
}
