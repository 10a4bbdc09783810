use anyhow::{Context, Result};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use tracing::debug;

use crate::pose::LandmarkSet;

/// Wekinator の入力アドレス
pub const OSC_ADDRESS: &str = "/wek/inputs";

/// Wekinator のデフォルト受信ポート
pub const DEFAULT_PORT: u16 = 6448;

/// 1フレーム分の送信メッセージ
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// 姿勢が検出されなかった
    Absent,
    Present(LandmarkSet),
}

impl OutboundMessage {
    pub fn from_landmarks(landmarks: Option<&LandmarkSet>) -> Self {
        match landmarks {
            Some(set) => Self::Present(*set),
            None => Self::Absent,
        }
    }

    /// OSC 引数の数 (1 または 1 + 33 * 4 = 133)
    pub fn arg_count(&self) -> usize {
        match self {
            Self::Absent => 1,
            Self::Present(set) => 1 + set.iter().count() * 4,
        }
    }
}

/// 送信するOSCメッセージを構築
///
/// 引数: flag, x0, y0, z0, v0, x1, ... , v32
/// flag: 0=未検出 (後続なし), 1=検出
pub fn build_osc_message(message: &OutboundMessage) -> OscMessage {
    let args = match message {
        OutboundMessage::Absent => vec![OscType::Int(0)],
        OutboundMessage::Present(set) => {
            let mut args = Vec::with_capacity(message.arg_count());
            args.push(OscType::Int(1));
            for landmark in set {
                args.push(OscType::Float(landmark.x));
                args.push(OscType::Float(landmark.y));
                args.push(OscType::Float(landmark.z));
                args.push(OscType::Float(landmark.visibility));
            }
            args
        }
    };

    OscMessage {
        addr: OSC_ADDRESS.to_string(),
        args,
    }
}

/// OSCメッセージをバイト列にエンコード
pub fn encode_osc_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(msg.clone());
    let encoded = encoder::encode(&packet)?;
    Ok(encoded)
}

/// フレームごとのメッセージ送信先
pub trait MessageSink {
    fn send(&mut self, message: &OutboundMessage) -> Result<()>;
}

/// UDP で OSC を投げっぱなしで送るクライアント
pub struct OscClient {
    socket: UdpSocket,
    target_addr: SocketAddr,
}

impl OscClient {
    /// 送信先を解決し、同じアドレスファミリのエフェメラルポートにバインドする
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let target_addr = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("Failed to resolve {}:{}", host, port))?
            .next()
            .with_context(|| format!("No address found for {}:{}", host, port))?;

        let bind_addr = if target_addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr).context("Failed to bind UDP socket")?;
        if target_addr.is_ipv4() {
            socket.set_broadcast(true)?;
        }

        Ok(Self { socket, target_addr })
    }

    pub fn target_addr(&self) -> SocketAddr {
        self.target_addr
    }
}

impl MessageSink for OscClient {
    fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        let msg = build_osc_message(message);
        let data = encode_osc_message(&msg)?;
        let sent = self.socket.send_to(&data, self.target_addr)?;
        debug!(bytes = sent, args = msg.args.len(), "OSC sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Landmark, LandmarkIndex};
    use std::time::Duration;

    fn sample_set() -> LandmarkSet {
        let mut landmarks = [Landmark::default(); LandmarkIndex::COUNT];
        for (i, lm) in landmarks.iter_mut().enumerate() {
            let f = i as f32;
            *lm = Landmark::new(f * 0.01, f * 0.02, -f * 0.001, 1.0 - f * 0.01);
        }
        LandmarkSet::new(landmarks)
    }

    #[test]
    fn test_build_osc_message_address() {
        let msg = build_osc_message(&OutboundMessage::Absent);
        assert_eq!(msg.addr, "/wek/inputs");
    }

    #[test]
    fn test_absent_is_single_zero() {
        let msg = build_osc_message(&OutboundMessage::from_landmarks(None));
        assert_eq!(msg.args, vec![OscType::Int(0)]);
    }

    #[test]
    fn test_present_flattens_in_landmark_order() {
        let set = sample_set();
        let msg = build_osc_message(&OutboundMessage::from_landmarks(Some(&set)));

        assert_eq!(msg.args.len(), 133);
        assert_eq!(msg.args[0], OscType::Int(1));
        for (i, lm) in set.iter().enumerate() {
            let base = 1 + i * 4;
            assert_eq!(msg.args[base], OscType::Float(lm.x));
            assert_eq!(msg.args[base + 1], OscType::Float(lm.y));
            assert_eq!(msg.args[base + 2], OscType::Float(lm.z));
            assert_eq!(msg.args[base + 3], OscType::Float(lm.visibility));
        }
    }

    #[test]
    fn test_all_zero_visible_pose() {
        let set = LandmarkSet::new([Landmark::new(0.0, 0.0, 0.0, 1.0); LandmarkIndex::COUNT]);
        let msg = build_osc_message(&OutboundMessage::Present(set));

        let mut expected = vec![OscType::Int(1)];
        for _ in 0..33 {
            expected.extend([
                OscType::Float(0.0),
                OscType::Float(0.0),
                OscType::Float(0.0),
                OscType::Float(1.0),
            ]);
        }
        assert_eq!(msg.args, expected);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let message = OutboundMessage::Present(sample_set());
        let a = encode_osc_message(&build_osc_message(&message)).unwrap();
        let b = encode_osc_message(&build_osc_message(&message)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encoded_packet_decodes() {
        let message = OutboundMessage::Present(sample_set());
        let encoded = encode_osc_message(&build_osc_message(&message)).unwrap();

        let (_, packet) = rosc::decoder::decode_udp(&encoded).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, OSC_ADDRESS);
                assert_eq!(msg.args.len(), 133);
                assert_eq!(msg.args[0], OscType::Int(1));
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn test_arg_count() {
        assert_eq!(OutboundMessage::Absent.arg_count(), 1);
        assert_eq!(OutboundMessage::Present(sample_set()).arg_count(), 133);
    }

    #[test]
    fn test_client_sends_one_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mut client = OscClient::new("127.0.0.1", port).unwrap();
        client.send(&OutboundMessage::Absent).unwrap();

        let mut buf = [0u8; rosc::decoder::MTU];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let (_, packet) = rosc::decoder::decode_udp(&buf[..len]).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, OSC_ADDRESS);
                assert_eq!(msg.args, vec![OscType::Int(0)]);
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }

    #[test]
    fn test_client_resolves_target() {
        let client = OscClient::new("127.0.0.1", DEFAULT_PORT).unwrap();
        assert_eq!(client.target_addr(), "127.0.0.1:6448".parse::<SocketAddr>().unwrap());
    }
}
