//! # Address Object Normalization
//!
//! Turns an [`AddressRecord`] into the payload the manager expects for a
//! network/mask address object.
//!
//! Subnets are parsed non-strictly: `10.1.2.3/24` is accepted and becomes
//! `10.1.2.0/24`. Accepted forms are:
//! * `addr` (a host route, `/32` or `/128`),
//! * `addr/prefix`,
//! * `addr/netmask` for IPv4, e.g. `192.168.1.0/255.255.255.0`.

use std::net::{IpAddr, Ipv4Addr};

use pnet::ipnetwork::{self, IpNetwork};
use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use super::record::AddressRecord;

pub const OBJECT_TYPE: &str = "ipmask";
pub const MIN_COLOR: u8 = 1;
pub const MAX_COLOR: u8 = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid subnet '{input}': {reason}")]
pub struct InvalidSubnetError {
    pub input: String,
    pub reason: String,
}

impl InvalidSubnetError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Canonical create payload for one address object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressObject {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub subnet: String,
    pub comment: String,
    pub color: u8,
}

impl AddressObject {
    pub fn from_record(record: &AddressRecord) -> Result<Self, InvalidSubnetError> {
        Self::normalize(&record.name, &record.subnet, &record.comment, record.color)
    }

    /// Builds the payload, drawing a random color when `color` is unusable.
    pub fn normalize(
        name: &str,
        subnet: &str,
        comment: &str,
        color: Option<i64>,
    ) -> Result<Self, InvalidSubnetError> {
        Self::normalize_with(name, subnet, comment, color, &mut rand::rng())
    }

    pub fn normalize_with<R: Rng>(
        name: &str,
        subnet: &str,
        comment: &str,
        color: Option<i64>,
        rng: &mut R,
    ) -> Result<Self, InvalidSubnetError> {
        let network = parse_network(subnet)?;

        Ok(Self {
            name: name.to_string(),
            kind: OBJECT_TYPE,
            subnet: format!("{}/{}", network.network(), network.prefix()),
            comment: comment.to_string(),
            color: resolve_color(color, rng),
        })
    }
}

/// Parses `expr` as a network, clearing any host bits.
pub fn parse_network(expr: &str) -> Result<IpNetwork, InvalidSubnetError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return Err(InvalidSubnetError::new(expr, "empty expression"));
    }

    let (addr_str, prefix_str) = match trimmed.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (trimmed, None),
    };

    let addr = addr_str
        .parse::<IpAddr>()
        .map_err(|e| InvalidSubnetError::new(expr, format!("bad address '{addr_str}': {e}")))?;

    let prefix = match prefix_str {
        Some(prefix) => parse_prefix(expr, &addr, prefix)?,
        None => max_prefix(&addr),
    };

    let network = IpNetwork::new(addr, prefix).map_err(|e| InvalidSubnetError::new(expr, e.to_string()))?;

    IpNetwork::new(network.network(), prefix).map_err(|e| InvalidSubnetError::new(expr, e.to_string()))
}

fn parse_prefix(expr: &str, addr: &IpAddr, prefix: &str) -> Result<u8, InvalidSubnetError> {
    if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
        let value = prefix
            .parse::<u8>()
            .map_err(|e| InvalidSubnetError::new(expr, format!("bad prefix '{prefix}': {e}")))?;
        if value > max_prefix(addr) {
            return Err(InvalidSubnetError::new(
                expr,
                format!("prefix /{value} is too long for {addr}"),
            ));
        }
        return Ok(value);
    }

    match (addr, prefix.parse::<Ipv4Addr>()) {
        (IpAddr::V4(_), Ok(mask)) => ipnetwork::ipv4_mask_to_prefix(mask)
            .map_err(|e| InvalidSubnetError::new(expr, format!("bad netmask '{prefix}': {e}"))),
        _ => Err(InvalidSubnetError::new(expr, format!("bad prefix '{prefix}'"))),
    }
}

fn max_prefix(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

/// Keeps `color` when it is within `[MIN_COLOR, MAX_COLOR]`, otherwise draws one.
pub fn resolve_color<R: Rng>(color: Option<i64>, rng: &mut R) -> u8 {
    match color {
        Some(value) if (i64::from(MIN_COLOR)..=i64::from(MAX_COLOR)).contains(&value) => value as u8,
        _ => rng.random_range(MIN_COLOR..=MAX_COLOR),
    }
}
