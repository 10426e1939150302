//! CSV export of a peer list.
//!
//!   "Host","Latency (ms)","Valid"
//!   "tls://a:1","12","Valid"
//!   "tcp://b:2","Failed","Invalid"
//!   "tcp://c:3","Not Tested",""

use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::peer::{Latency, PeerRecord};

const HEADER: [&str; 3] = ["Host", "Latency (ms)", "Valid"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv flush failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn latency_field(latency: Latency) -> String {
    match latency {
        Latency::NotTested => "Not Tested".to_string(),
        Latency::Failed => "Failed".to_string(),
        Latency::Measured(ms) => ms.to_string(),
    }
}

fn validity_field(peer: &PeerRecord) -> &'static str {
    match (peer.is_tested(), peer.is_valid()) {
        (false, _) => "",
        (true, true) => "Valid",
        (true, false) => "Invalid",
    }
}

fn writer<W: Write>(out: W) -> csv::Writer<W> {
    WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(out)
}

fn write_rows<W: Write>(wtr: &mut csv::Writer<W>, peers: &[PeerRecord]) -> Result<(), ExportError> {
    wtr.write_record(HEADER)?;
    for peer in peers {
        wtr.write_record([
            peer.host.as_str(),
            latency_field(peer.latency).as_str(),
            validity_field(peer),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the header and one row per peer.
pub fn write_csv<W: Write>(out: W, peers: &[PeerRecord]) -> Result<(), ExportError> {
    write_rows(&mut writer(out), peers)
}

pub fn to_csv_string(peers: &[PeerRecord]) -> Result<String, ExportError> {
    let mut wtr = writer(Vec::new());
    write_rows(&mut wtr, peers)?;
    let data = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(data)?)
}

/// Create or overwrite `path` with the CSV export.
pub fn export_csv(path: &Path, peers: &[PeerRecord]) -> Result<(), ExportError> {
    let file = std::fs::File::create(path)?;
    write_csv(std::io::BufWriter::new(file), peers)
}
