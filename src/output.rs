//! Output formatting for byte-pattern search results

use crate::index::repeats::Repeat;
use crate::index::suffix_array::{MatchContext, SearchHits};
use crate::source::ByteSource;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Bytes per hex dump row
const ROW_WIDTH: usize = 16;

/// Longest repeat preview printed inline
const PREVIEW_BYTES: usize = 48;

/// Open stdout with colors enabled or disabled
pub fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print match offsets, one per line, hex then decimal
pub fn print_offsets<W: WriteColor>(out: &mut W, hits: &SearchHits) -> io::Result<()> {
    for &offset in &hits.offsets {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "0x{:08x}", offset)?;
        out.reset()?;
        writeln!(out, "  {}", offset)?;
    }
    print_truncation(out, hits)
}

/// Print a hex dump around each match, with the match highlighted
pub fn print_contexts<W: WriteColor>(
    out: &mut W,
    contexts: &[MatchContext],
    hits: &SearchHits,
) -> io::Result<()> {
    for (i, ctx) in contexts.iter().enumerate() {
        if i > 0 {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
            writeln!(out, "--")?;
            out.reset()?;
        }
        print_hex_dump(out, ctx)?;
    }
    print_truncation(out, hits)
}

fn print_truncation<W: WriteColor>(out: &mut W, hits: &SearchHits) -> io::Result<()> {
    if hits.is_truncated() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        writeln!(
            out,
            "... {} more matches not shown ({} total)",
            hits.total - hits.offsets.len() as u64,
            hits.total
        )?;
        out.reset()?;
    }
    Ok(())
}

/// Classic `offset  hex  |ascii|` dump of one context window
pub fn print_hex_dump<W: WriteColor>(out: &mut W, ctx: &MatchContext) -> io::Result<()> {
    let highlight = ctx.match_start..ctx.match_start + ctx.match_len;
    let mut match_spec = ColorSpec::new();
    match_spec.set_fg(Some(Color::Red)).set_bold(true);

    for (row, chunk) in ctx.bytes.chunks(ROW_WIDTH).enumerate() {
        let row_start = row * ROW_WIDTH;

        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "{:08x}", ctx.start + row_start as u64)?;
        out.reset()?;
        write!(out, "  ")?;

        for col in 0..ROW_WIDTH {
            if col == ROW_WIDTH / 2 {
                write!(out, " ")?;
            }
            match chunk.get(col) {
                Some(byte) if highlight.contains(&(row_start + col)) => {
                    out.set_color(&match_spec)?;
                    write!(out, "{:02x}", byte)?;
                    out.reset()?;
                    write!(out, " ")?;
                }
                Some(byte) => write!(out, "{:02x} ", byte)?,
                None => write!(out, "   ")?,
            }
        }

        write!(out, " |")?;
        for (col, &byte) in chunk.iter().enumerate() {
            if highlight.contains(&(row_start + col)) {
                out.set_color(&match_spec)?;
                write!(out, "{}", printable(byte))?;
                out.reset()?;
            } else {
                write!(out, "{}", printable(byte))?;
            }
        }
        writeln!(out, "|")?;
    }
    Ok(())
}

/// Print repeated substrings with a short preview of each
pub fn print_repeats<W: WriteColor, S: ByteSource + ?Sized>(
    out: &mut W,
    source: &S,
    repeats: &[Repeat],
) -> io::Result<()> {
    if repeats.is_empty() {
        writeln!(out, "No repeated substrings found.")?;
        return Ok(());
    }

    writeln!(out, "{:>10}  {:>6}  {:>10}  preview", "length", "count", "offset")?;
    for repeat in repeats {
        let mut preview = vec![0u8; (repeat.len as usize).min(PREVIEW_BYTES)];
        let read = source.read_range(repeat.offset, &mut preview);
        preview.truncate(read);

        write!(out, "{:>10}  {:>6}  ", repeat.len, repeat.occurrences)?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        write!(out, "0x{:08x}", repeat.offset)?;
        out.reset()?;
        write!(out, "  ")?;

        out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
        write!(out, "{}", escape_preview(&preview))?;
        out.reset()?;
        if repeat.len as usize > preview.len() {
            write!(out, "...")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn printable(byte: u8) -> char {
    if byte.is_ascii_graphic() || byte == b' ' {
        byte as char
    } else {
        '.'
    }
}

/// Render bytes as text, escaping anything that is not printable ASCII
pub fn escape_preview(bytes: &[u8]) -> String {
    bytes
        .iter()
        .flat_map(|&b| std::ascii::escape_default(b))
        .map(char::from)
        .collect()
}
