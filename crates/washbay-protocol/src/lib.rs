pub mod codec;
pub mod command;
pub mod keycode;
pub mod line;
pub mod message;
pub mod normalize;

pub use codec::LinkCodec;
pub use command::{SystemCommand, parse_system_command};
pub use keycode::{KeyReportAssembler, decode_keycodes, keycode_char};
pub use line::{LineAssembler, LineEvent, decode_lossy};
pub use message::{ActivationResponse, FaultReason, Inbound, Outbound, Verdict, parse_inbound};
pub use normalize::{normalize_identifier, strip_duplicate};
