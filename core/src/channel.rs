//! Pull-driven streaming channel
//!
//! Every listener hands out [`Channel`]s on demand, one per selector. A
//! channel is the consumer half of a bounded, pull-driven stream:
//!
//! ```text
//! Consumer                         Producer task (owned by the listener)
//!   next() ──► pull queue ──────────► fetch one item
//!   recv() ◄── item queue  ◄────────── decoded Message
//!          ◄── error queue ◄────────── ComponentError (out-of-band)
//! ```
//!
//! [`Channel::next`] is fire-and-continue: it requests one more item and
//! returns immediately. Items arrive on the output queue in delivery order
//! for that channel; failures arrive on a separate error queue so a bad pull
//! never terminates the stream. Dropping the `Channel` closes the pull queue,
//! which the producer observes as end-of-life - no explicit cancellation
//! token is needed and abandoned streams cannot leak.

use crate::error::ComponentError;
use crate::message::Message;
use tokio::sync::mpsc;

/// Default depth of the pull, item, and error queues
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// An event observed on a channel: an item or an out-of-band error
#[derive(Debug)]
pub enum ChannelEvent {
    /// A decoded message, in delivery order for this channel
    Item(Message),
    /// A delivery/source failure; the channel stays alive
    Error(ComponentError),
}

/// Consumer half of a listener stream
///
/// Created by [`Listener::new_channel`](crate::Listener::new_channel).
/// Multiple channels may exist against one listener; each is independent and
/// may be consumed concurrently.
pub struct Channel {
    pulls: mpsc::Sender<()>,
    items: mpsc::Receiver<Message>,
    errors: mpsc::Receiver<ComponentError>,
}

impl Channel {
    /// Request that one more item be produced and delivered asynchronously
    ///
    /// Never blocks and gives no guarantee the item has arrived by the time
    /// it returns. Pulls queue up to the channel capacity; beyond that the
    /// request is dropped, since that many items are already on their way.
    pub fn next(&self) {
        let _ = self.pulls.try_send(());
    }

    /// Await the next event: an item or an out-of-band error
    ///
    /// Returns `None` once the producer has gone away and both queues are
    /// drained. Individual errors never end the stream.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        tokio::select! {
            Some(msg) = self.items.recv() => Some(ChannelEvent::Item(msg)),
            Some(err) = self.errors.recv() => Some(ChannelEvent::Error(err)),
            else => None,
        }
    }

    /// Direct access to the item queue, for consumers that select themselves
    pub fn out(&mut self) -> &mut mpsc::Receiver<Message> {
        &mut self.items
    }

    /// Direct access to the error queue
    pub fn errors(&mut self) -> &mut mpsc::Receiver<ComponentError> {
        &mut self.errors
    }
}

/// Producer half of a listener stream
///
/// A listener implementation owns one of these per created channel,
/// typically inside a spawned task: await [`pulled`](ChannelSource::pulled),
/// fetch one item, then [`deliver`](ChannelSource::deliver) or
/// [`fail`](ChannelSource::fail).
pub struct ChannelSource {
    pulls: mpsc::Receiver<()>,
    items: mpsc::Sender<Message>,
    errors: mpsc::Sender<ComponentError>,
}

impl ChannelSource {
    /// Wait for the next pull request
    ///
    /// Returns `false` when the consumer has dropped its [`Channel`]; the
    /// producer should stop and release its resources.
    pub async fn pulled(&mut self) -> bool {
        self.pulls.recv().await.is_some()
    }

    /// Deliver one item to the consumer
    ///
    /// Suspends while the item queue is full (bounded buffering). Returns
    /// `false` if the consumer has gone away.
    pub async fn deliver(&self, msg: Message) -> bool {
        self.items.send(msg).await.is_ok()
    }

    /// Report a source failure out-of-band
    ///
    /// Returns `false` if the consumer has gone away.
    pub async fn fail(&self, err: ComponentError) -> bool {
        self.errors.send(err).await.is_ok()
    }
}

/// Create a connected consumer/producer pair with the given queue depth
pub fn channel(capacity: usize) -> (Channel, ChannelSource) {
    let (pull_tx, pull_rx) = mpsc::channel(capacity.max(1));
    let (item_tx, item_rx) = mpsc::channel(capacity.max(1));
    let (err_tx, err_rx) = mpsc::channel(capacity.max(1));
    (
        Channel {
            pulls: pull_tx,
            items: item_rx,
            errors: err_rx,
        },
        ChannelSource {
            pulls: pull_rx,
            items: item_tx,
            errors: err_tx,
        },
    )
}
