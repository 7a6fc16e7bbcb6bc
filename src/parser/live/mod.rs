/*!
Decoder for the live feed's record format.

Each frame of the feed is a flat JSON object:

```text
{"record_type": "update", "vp": "64500_192.0.2.1", "sec": 1700000000, "usec": 250000,
 "prefixes": "10.0.0.0/8,192.168.0.0/16", "as-path": "64500 3356 13335",
 "communities": "3356:100", "nexthop": "192.0.2.1", "origin": "IGP"}
```

Decoding is pure: no I/O, no state carried between records.
*/
mod record;

pub use record::RawRecord;

use crate::error::DecodeError;
use crate::models::{RouteUpdate, UpdateKind, VantagePoint};

/// `record_type` token of an announcement.
pub const ANNOUNCE_RECORD_TYPE: &str = "update";
/// `record_type` token of a withdrawal, as the feed spells it. Matched literally: the correctly
/// spelled `"withdraw"` is an invalid record type.
pub const WITHDRAW_RECORD_TYPE: &str = "withraw";

/// Decodes one record into a [RouteUpdate].
///
/// Fails only when the record type is missing or unknown, or when the vantage point field is
/// absent. A vantage point that is present but malformed yields an update without vantage
/// point, which is [not valid](RouteUpdate::is_valid). Missing optional fields are left at
/// their defaults.
///
/// # Example
///
/// ```
/// use bgproutes_live::{decode_record, RawRecord};
///
/// let record: RawRecord = r#"{"record_type":"update","vp":"64500_192.0.2.1","prefixes":"10.0.0.0/8"}"#
///     .parse()
///     .unwrap();
/// let update = decode_record(&record).unwrap();
/// assert!(update.is_valid());
/// assert_eq!(update.prefixes, vec!["10.0.0.0/8"]);
/// ```
pub fn decode_record(record: &RawRecord) -> Result<RouteUpdate, DecodeError> {
    let kind = decode_kind(record)?;

    let vantage_point = match record.get("vp") {
        None => return Err(DecodeError::MissingVantagePoint),
        Some(vp) => vp.as_str().and_then(parse_vantage_point),
    };

    let timestamp = record.number("sec").map(|sec| match record
        .number("usec")
        .or_else(|| record.number("Usec"))
    {
        Some(usec) => sec + usec / 1_000_000.0,
        None => sec,
    });

    let prefixes = match record.text("prefixes") {
        Some(p) => p.split(',').map(|s| s.to_string()).collect(),
        None => vec![],
    };

    Ok(RouteUpdate {
        kind,
        timestamp,
        vantage_point,
        prefixes,
        as_path: record.text("as-path").unwrap_or_default(),
        communities: record.text("communities").unwrap_or_default(),
        next_hop: record.text("nexthop"),
        origin: record.text("origin"),
    })
}

fn decode_kind(record: &RawRecord) -> Result<UpdateKind, DecodeError> {
    let record_type = record
        .get("record_type")
        .ok_or(DecodeError::MissingRecordType)?;
    match record_type.as_str() {
        Some(ANNOUNCE_RECORD_TYPE) => Ok(UpdateKind::Announce),
        Some(WITHDRAW_RECORD_TYPE) => Ok(UpdateKind::Withdraw),
        Some(other) => Err(DecodeError::InvalidRecordType(other.to_string())),
        None => Err(DecodeError::InvalidRecordType(record_type.to_string())),
    }
}

/// Parses `<asn>_<ip>`. Returns `None` without a separator or with a non-numeric ASN. Anything
/// after a second `_` is dropped.
fn parse_vantage_point(vp: &str) -> Option<VantagePoint> {
    let mut parts = vp.split('_');
    let asn = parts.next()?.trim().parse::<u32>().ok()?;
    let ip = parts.next()?;
    Some(VantagePoint::new(asn, ip))
}
