use itertools::Itertools;
use std::fmt::{Display, Formatter};

/// # UpdateKind
///
/// `UpdateKind` represents the type of a route update received from the live feed.
///
/// - `Announce`: a new or changed reachability claim for the carried prefixes.
/// - `Withdraw`: the removal of a previously announced reachability claim.
///
/// Example usage:
///
/// ```
/// use bgproutes_live::models::UpdateKind;
///
/// assert_eq!(UpdateKind::Announce.as_code(), "U");
/// assert_eq!(UpdateKind::Withdraw.to_string(), "W");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UpdateKind {
    Announce,
    Withdraw,
}

impl UpdateKind {
    /// Single-letter code used in the pipe-separated rendering: `U` or `W`.
    pub fn as_code(&self) -> &'static str {
        match self {
            UpdateKind::Announce => "U",
            UpdateKind::Withdraw => "W",
        }
    }
}

impl Display for UpdateKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_code())
    }
}

/// The route collector that observed an update, identified by its ASN and IP address.
///
/// The IP is kept as the string the feed sent; the feed does not guarantee it parses as an
/// address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VantagePoint {
    pub asn: u32,
    pub ip: String,
}

impl VantagePoint {
    pub fn new(asn: u32, ip: impl Into<String>) -> Self {
        VantagePoint { asn, ip: ip.into() }
    }
}

impl Display for VantagePoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.asn, self.ip)
    }
}

/// RouteUpdate represents one decoded record of the live feed.
///
/// A `RouteUpdate` always carries a kind: records without a recognizable record type are
/// rejected by the decoder and never become a `RouteUpdate`. The vantage point, on the other
/// hand, may be missing when the feed sent a malformed value; such updates are
/// [invalid](RouteUpdate::is_valid) and are dropped by the stream session.
///
/// Fields:
/// - `kind`: announcement or withdrawal.
/// - `timestamp`: seconds since epoch with sub-second precision, when the feed sent one.
/// - `vantage_point`: the observing collector.
/// - `prefixes`: the CIDR prefixes carried by the record, in feed order.
/// - `as_path`: the raw space-separated AS path.
/// - `communities`: the raw communities string.
/// - `next_hop`: the next hop, if sent.
/// - `origin`: the origin attribute, if sent.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RouteUpdate {
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: UpdateKind,
    pub timestamp: Option<f64>,
    pub vantage_point: Option<VantagePoint>,
    pub prefixes: Vec<String>,
    pub as_path: String,
    pub communities: String,
    pub next_hop: Option<String>,
    pub origin: Option<String>,
}

impl Default for RouteUpdate {
    fn default() -> Self {
        RouteUpdate {
            kind: UpdateKind::Announce,
            timestamp: None,
            vantage_point: None,
            prefixes: vec![],
            as_path: String::new(),
            communities: String::new(),
            next_hop: None,
            origin: None,
        }
    }
}

/// `OptionToStr` wraps an `Option` and renders `None` as an empty string.
struct OptionToStr<'a, T>(&'a Option<T>);

impl<T: Display> Display for OptionToStr<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            None => Ok(()),
            Some(x) => write!(f, "{x}"),
        }
    }
}

impl Display for RouteUpdate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let (vp_asn, vp_ip) = match &self.vantage_point {
            Some(vp) => (Some(vp.asn), Some(vp.ip.as_str())),
            None => (None, None),
        };
        write!(
            f,
            "{}|{}|{}|{}|{}|{}|{}|{}|{}",
            OptionToStr(&self.timestamp),
            self.kind.as_code(),
            OptionToStr(&vp_asn),
            OptionToStr(&vp_ip),
            self.prefixes.iter().join(","),
            &self.as_path,
            &self.communities,
            OptionToStr(&self.origin),
            OptionToStr(&self.next_hop),
        )
    }
}

impl RouteUpdate {
    /// An update is valid when both its kind and its vantage point were decoded. Only valid
    /// updates are handed to consumers of a stream session.
    pub fn is_valid(&self) -> bool {
        self.vantage_point.is_some()
    }

    /// Returns true if the update is an announcement.
    pub fn is_announcement(&self) -> bool {
        self.kind == UpdateKind::Announce
    }

    /// Iterates over the AS path tokens that parse as ASNs, skipping anything else (AS sets,
    /// stray separators).
    pub fn as_path_asns(&self) -> impl Iterator<Item = u32> + '_ {
        self.as_path
            .split_whitespace()
            .filter_map(|token| token.parse::<u32>().ok())
    }

    /// Returns the origin ASN, i.e. the last hop of the AS path. Returns `None` if the path is
    /// empty or its last token is not a plain ASN.
    pub fn origin_asn(&self) -> Option<u32> {
        self.as_path.split_whitespace().last()?.parse::<u32>().ok()
    }

    /// Returns the PSV header matching [RouteUpdate::to_psv].
    ///
    /// # Example
    ///
    /// ```
    /// use bgproutes_live::RouteUpdate;
    ///
    /// let header = RouteUpdate::get_psv_header();
    /// assert_eq!(header, "timestamp|type|vp_asn|vp_ip|prefixes|as_path|communities|origin|next_hop");
    /// ```
    pub fn get_psv_header() -> String {
        let fields = [
            "timestamp",
            "type",
            "vp_asn",
            "vp_ip",
            "prefixes",
            "as_path",
            "communities",
            "origin",
            "next_hop",
        ];
        fields.join("|")
    }

    /// Converts the update into its pipe-separated values (PSV) line. Same as the `Display`
    /// rendering.
    pub fn to_psv(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_update() -> RouteUpdate {
        RouteUpdate {
            kind: UpdateKind::Announce,
            timestamp: Some(1700000000.25),
            vantage_point: Some(VantagePoint::new(64500, "192.0.2.1")),
            prefixes: vec!["10.0.0.0/8".to_string(), "192.168.0.0/16".to_string()],
            as_path: "64500 3356 13335".to_string(),
            communities: "3356:100 3356:2001".to_string(),
            next_hop: Some("192.0.2.1".to_string()),
            origin: Some("IGP".to_string()),
        }
    }

    #[test]
    fn test_psv() {
        let update = sample_update();
        assert_eq!(
            update.to_psv(),
            "1700000000.25|U|64500|192.0.2.1|10.0.0.0/8,192.168.0.0/16|64500 3356 13335|3356:100 3356:2001|IGP|192.0.2.1"
        );

        let update = RouteUpdate::default();
        assert_eq!(update.to_psv(), "|U|||||||");
    }

    #[test]
    fn test_psv_round_trip_fields() {
        let update = RouteUpdate {
            kind: UpdateKind::Withdraw,
            ..sample_update()
        };
        let line = update.to_string();
        let fields: Vec<&str> = line.split('|').collect();
        let header = RouteUpdate::get_psv_header();
        assert_eq!(fields.len(), header.split('|').count());

        assert_eq!(fields[0].parse::<f64>().unwrap(), 1700000000.25);
        assert_eq!(fields[1], "W");
        assert_eq!(fields[2], "64500");
        assert_eq!(fields[3], "192.0.2.1");
        assert_eq!(
            fields[4].split(',').collect::<Vec<_>>(),
            vec!["10.0.0.0/8", "192.168.0.0/16"]
        );
        assert_eq!(fields[5], update.as_path);
        assert_eq!(fields[6], update.communities);
        assert_eq!(fields[7], "IGP");
        assert_eq!(fields[8], "192.0.2.1");
    }

    #[test]
    fn test_validity() {
        assert!(sample_update().is_valid());
        let update = RouteUpdate {
            vantage_point: None,
            ..sample_update()
        };
        assert!(!update.is_valid());
    }

    #[test]
    fn test_origin_asn() {
        let update = sample_update();
        assert_eq!(update.origin_asn(), Some(13335));
        assert_eq!(
            update.as_path_asns().collect::<Vec<_>>(),
            vec![64500, 3356, 13335]
        );

        let update = RouteUpdate {
            as_path: "64500 {13335,13336}".to_string(),
            ..sample_update()
        };
        assert_eq!(update.origin_asn(), None);
        assert_eq!(RouteUpdate::default().origin_asn(), None);
    }

    #[test]
    fn test_option_to_str() {
        let asn_opt: Option<u32> = Some(12);
        assert_eq!(OptionToStr(&asn_opt).to_string(), "12");
        let none_opt: Option<u32> = None;
        assert_eq!(OptionToStr(&none_opt).to_string(), "");
    }

    #[test]
    #[cfg(feature = "serde")]
    fn test_serialize() {
        let value = serde_json::to_value(sample_update()).unwrap();
        assert_eq!(value["type"], "announce");
        assert_eq!(value["vantage_point"]["asn"], 64500);
    }
}
