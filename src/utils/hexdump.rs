use std::cmp;
use std::fmt::Write as FmtWrite;
use std::io::{self, Write};

/// Bytes rendered on each `hex_out` line.
pub const HEX_LINE_BYTES: usize = 32;

/// Writes `data` as labeled hex lines, in the same format template files use.
///
/// Buffers longer than [`HEX_LINE_BYTES`] are split over several lines that repeat the label,
/// which the template reader appends back together. An empty buffer is written as a bare label.
pub fn hex_out<W: Write>(out: &mut W, label: &str, data: &[u8]) -> io::Result<()> {
    if data.is_empty() {
        return writeln!(out, "{}", label);
    }

    for line in data.chunks(HEX_LINE_BYTES) {
        writeln!(out, "{} {}", label, hex::encode(line))?;
    }
    Ok(())
}

/// Canonical hexdump of `data`: offset, sixteen hex bytes, then the printable characters.
///
/// `offset` is added to the addresses shown in the first column.
pub fn hexdump(data: &[u8], offset: usize) -> String {
    let mut out = String::new();
    let mut address = 0;

    while address < data.len() {
        // Next 16 bytes, or until end of data
        let end = cmp::min(address + 16, data.len());
        dump_line(&mut out, &data[address..end], address + offset);
        address += 16;
    }

    out
}

fn dump_line(out: &mut String, line: &[u8], address: usize) {
    // `fmt::Write` for `String` never fails.
    let _ = write!(out, "{:08x}:", address);

    for b in line {
        let _ = write!(out, " {:02x}", b);
    }

    // align
    for _ in line.len()..16 {
        out.push_str("   ");
    }

    out.push_str("  |");
    for c in line {
        // replace all control and non-ascii chars with dots
        match *c {
            0x20..=0x7e => out.push(*c as char),
            _ => out.push('.'),
        }
    }
    out.push_str("|\n");
}
