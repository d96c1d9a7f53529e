pub mod bytes;
mod hexdump;
mod random;

pub use self::bytes::{be_bytes_to_nbr, le_bytes_to_nbr, nbr_to_be_bytes, nbr_to_le_bytes};
pub use self::hexdump::{HEX_LINE_BYTES, hex_out, hexdump};
pub use self::random::block_rndfill;
