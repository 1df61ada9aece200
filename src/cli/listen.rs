//! `vocalis listen` — play a call's responses as they are produced.

use std::time::Duration;

use anyhow::Result;

use crate::poller::{player::RodioPlayer, HttpFeedClient, PlaybackPoller};

use super::args::ListenCliArgs;

pub async fn handle_listen_command(args: ListenCliArgs) -> Result<()> {
    let client = HttpFeedClient::new(args.base_url.as_str())?;
    let player = RodioPlayer::new()?;

    let poller = PlaybackPoller::new(
        client,
        player,
        args.call_id,
        Duration::from_millis(args.interval_ms),
    );

    poller.run().await
}
