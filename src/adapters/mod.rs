//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements      | Connects to                  |
//! |-------------|-----------------|------------------------------|
//! | `sim_stack` | StackPort       | In-memory radio stack        |
//! |             | AttributePort   | In-memory GATT database      |
//! |             | ClockPort       | `time::HostClock`            |
//! | `log_sink`  | EventSink       | `log` output                 |
//! | `time`      | ClockPort       | Host monotonic clock         |

pub mod log_sink;
pub mod sim_stack;
pub mod time;
