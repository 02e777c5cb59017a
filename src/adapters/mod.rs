//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements    | Connects to                   |
//! |------------|---------------|-------------------------------|
//! | `console`  | BoilerPort    | `<topic> <payload>` on stdout |
//! |            | EventSink     | state + diagnostic topics     |
//! | `log_sink` | EventSink     | `log` facade                  |
//! | `outbox`   | BoilerPort    | writer thread for any of the  |
//! |            | EventSink     | above, so the loop never      |
//! |            |               | blocks on output              |
//! | `store`    | StoragePort   | state directory / in-memory / |
//! |            |               | write-behind queue            |
//! | `topics`   | (inbound)     | topic → entity inbox routing  |

pub mod console;
pub mod log_sink;
pub mod outbox;
pub mod store;
pub mod topics;
