//! Multicast (SSDP) discovery strategy.
//!
//! Joins the well-known SSDP group, sends the three search messages staggered
//! to reduce collisions, and collects replies until the window closes.  Each
//! reply is classified and parsed in `tvlink-core`; candidates go into the
//! shared [`DeviceSink`].
//!
//! Every socket-level error is absorbed here: it is logged, terminates this
//! strategy only, and never propagates past the discovery call.  The sweep
//! strategy and the already-collected results are unaffected.

use std::net::Ipv4Addr;

use tokio::net::UdpSocket;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use tvlink_core::ssdp::{
    parse_probe_reply, search_message, ProbeReply, SEARCH_TARGETS, SSDP_ADDR, SSDP_PORT,
};

use crate::application::discovery::DeviceSink;
use crate::domain::ProxyConfig;

/// Runs the multicast probe until the discovery window closes.
pub async fn probe(config: &ProxyConfig, sink: &DeviceSink) {
    let socket = match UdpSocket::bind(("0.0.0.0", 0)).await {
        Ok(s) => s,
        Err(e) => {
            warn!("ssdp: failed to bind probe socket: {e}");
            return;
        }
    };

    // M-SEARCH replies come back unicast to this socket's ephemeral port,
    // so the join only registers interest with the local stack; a failed
    // join is logged and discovery continues on the unicast replies.
    if let Err(e) = socket.join_multicast_v4(SSDP_ADDR, Ipv4Addr::UNSPECIFIED) {
        warn!("ssdp: could not join multicast group: {e}");
    }

    debug!("ssdp: probe socket bound, sending search messages");

    let send_all = async {
        for (i, target) in SEARCH_TARGETS.iter().enumerate() {
            if i > 0 {
                sleep(config.probe_stagger).await;
            }
            let message = search_message(target);
            match socket.send_to(message.as_bytes(), (SSDP_ADDR, SSDP_PORT)).await {
                Ok(_) => debug!("ssdp: sent search #{} ({target})", i + 1),
                Err(e) => warn!("ssdp: failed to send search #{}: {e}", i + 1),
            }
        }
    };

    let recv_all = async {
        let mut buf = [0u8; 2048];
        let mut replies = 0usize;
        loop {
            let (len, src) = match socket.recv_from(&mut buf).await {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("ssdp: recv error: {e}");
                    break;
                }
            };
            replies += 1;

            let std::net::IpAddr::V4(source) = src.ip() else {
                debug!("ssdp: ignoring IPv6 reply from {src}");
                continue;
            };

            // Malformed replies are logged and discarded; discovery continues.
            let body = match std::str::from_utf8(&buf[..len]) {
                Ok(text) => text,
                Err(e) => {
                    debug!("ssdp: non-UTF-8 reply #{replies} from {source}: {e}");
                    continue;
                }
            };

            debug!("ssdp: reply #{replies} from {source}");
            let reply = ProbeReply::new(body, source);
            match parse_probe_reply(&reply, config.tv_port) {
                Some(tv) => {
                    sink.offer(tv);
                }
                None => debug!("ssdp: reply from {source} is not a TV candidate"),
            }
        }
    };

    // The receive loop only ends on error; the window bounds it.  Sends run
    // concurrently on the same socket.
    let _ = timeout(
        config.discovery_window,
        futures_util::future::join(send_all, recv_all),
    )
    .await;

    debug!("ssdp: probe window closed");
}
