/*!
Consumer-side filters applied to valid route updates.

Filters narrow down what a [Session](crate::Session) yields beyond the server-side prefix
subscription. All filters added to a session must match for an update to be yielded.

| filter type  | value                                    |
|--------------|------------------------------------------|
| `kind`       | `a`/`announce`/`u`/`update` or `w`/`withdraw` |
| `vp_asn`     | vantage point ASN                        |
| `vp_ip`      | vantage point IP, exact string match     |
| `prefix`     | one prefix carried by the update         |
| `origin_asn` | last ASN of the AS path                  |
| `ts_start`   | inclusive lower timestamp bound          |
| `ts_end`     | inclusive upper timestamp bound          |
| `as_path`    | regular expression on the raw AS path    |
*/
use crate::error::FilterError;
use crate::models::{RouteUpdate, UpdateKind};
use regex::Regex;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub enum Filter {
    Kind(UpdateKind),
    VantagePointAsn(u32),
    VantagePointIp(String),
    Prefix(String),
    OriginAsn(u32),
    TsStart(f64),
    TsEnd(f64),
    AsPath(Regex),
}

fn parse_value<T: FromStr>(what: &'static str, value: &str) -> Result<T, FilterError> {
    T::from_str(value.trim()).map_err(|_| FilterError::InvalidValue {
        what,
        value: value.to_string(),
    })
}

impl Filter {
    pub fn new(filter_type: &str, filter_value: &str) -> Result<Filter, FilterError> {
        match filter_type {
            "kind" | "type" => match filter_value.to_lowercase().as_str() {
                "a" | "u" | "announce" | "update" => Ok(Filter::Kind(UpdateKind::Announce)),
                "w" | "withdraw" | "withdrawal" => Ok(Filter::Kind(UpdateKind::Withdraw)),
                _ => Err(FilterError::InvalidValue {
                    what: "update kind",
                    value: filter_value.to_string(),
                }),
            },
            "vp_asn" => Ok(Filter::VantagePointAsn(parse_value(
                "vantage point asn",
                filter_value,
            )?)),
            "vp_ip" => Ok(Filter::VantagePointIp(filter_value.trim().to_string())),
            "prefix" => Ok(Filter::Prefix(filter_value.trim().to_string())),
            "origin_asn" => Ok(Filter::OriginAsn(parse_value("origin asn", filter_value)?)),
            "ts_start" | "start_ts" => Ok(Filter::TsStart(parse_value("f64 value", filter_value)?)),
            "ts_end" | "end_ts" => Ok(Filter::TsEnd(parse_value("f64 value", filter_value)?)),
            "as_path" | "path" => match Regex::new(filter_value) {
                Ok(v) => Ok(Filter::AsPath(v)),
                Err(_) => Err(FilterError::InvalidValue {
                    what: "AS path regex",
                    value: filter_value.to_string(),
                }),
            },
            _ => Err(FilterError::UnknownType(filter_type.to_string())),
        }
    }
}

pub trait Filterable {
    fn match_filter(&self, filter: &Filter) -> bool;
    fn match_filters(&self, filters: &[Filter]) -> bool;
}

impl Filterable for RouteUpdate {
    fn match_filter(&self, filter: &Filter) -> bool {
        match filter {
            Filter::Kind(v) => self.kind == *v,
            Filter::VantagePointAsn(v) => self.vantage_point.as_ref().is_some_and(|vp| vp.asn == *v),
            Filter::VantagePointIp(v) => self.vantage_point.as_ref().is_some_and(|vp| vp.ip == *v),
            Filter::Prefix(v) => self.prefixes.iter().any(|p| p == v),
            Filter::OriginAsn(v) => self.origin_asn() == Some(*v),
            Filter::TsStart(v) => self.timestamp.is_some_and(|ts| ts >= *v),
            Filter::TsEnd(v) => self.timestamp.is_some_and(|ts| ts <= *v),
            Filter::AsPath(v) => v.is_match(self.as_path.as_str()),
        }
    }

    fn match_filters(&self, filters: &[Filter]) -> bool {
        filters.iter().all(|f| self.match_filter(f))
    }
}
