use std::net::{IpAddr, SocketAddr};

use crate::{NetZoneAddress, NetworkZone};

impl NetZoneAddress for SocketAddr {
    type BanID = IpAddr;

    fn ban_id(&self) -> Self::BanID {
        self.ip()
    }
}

/// The clear-net zone: peers addressed by plain IP and port.
#[derive(Debug, Clone, Copy)]
pub enum ClearNet {}

impl NetworkZone for ClearNet {
    const NAME: &'static str = "ClearNet";

    type Addr = SocketAddr;
}
