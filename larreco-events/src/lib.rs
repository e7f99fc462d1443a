//! larreco-events: from a nearly time-ordered hit source to discrete events.
//!
//! # Pipeline
//!
//! 1. [`StreamSorter`] restores time order using a bounded look-ahead window.
//! 2. [`EventBuilder`] groups the sorted hits by time gaps into events.
//! 3. [`TriggerPairing`] optionally tags each event with an external trigger
//!    time found by an [`ExternalTriggerFinder`] strategy.
//!
//! # Example
//!
//! ```
//! use larreco_core::EventBuilderConfig;
//! use larreco_events::{EventBuilder, MemoryHitSource};
//!
//! let source = MemoryHitSource::from_timestamps(&[0, 20, 10, 30, 90_000, 90_010]);
//! let config = EventBuilderConfig::new().with_min_event_len(2);
//! let builder = EventBuilder::new(source, config)?;
//!
//! let sizes: Vec<usize> = builder
//!     .map(|event| event.map(|e| e.len()))
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(sizes, vec![4]);
//! # Ok::<(), larreco_core::Error>(())
//! ```

pub mod builder;
pub mod ordering;
pub mod source;
pub mod trigger;

pub use builder::{is_associated, EventBuilder};
pub use ordering::StreamSorter;
pub use source::MemoryHitSource;
pub use trigger::{ChannelBurstTrigger, ExternalTriggerFinder, TriggerPairing};
