use super::messages::{ClientMessage, ServerMessage};

/// Maximum accepted inbound frame size in bytes. Every client message is a
/// handful of fields; anything near this limit is garbage.
pub const MAX_MESSAGE_SIZE: usize = 8 * 1024;

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::EmptyMessage => write!(f, "empty message"),
            ProtocolError::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            },
            ProtocolError::SerializeError(e) => write!(f, "serialize error: {e}"),
            ProtocolError::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a server message as a JSON text frame.
pub fn encode_server_message(msg: &ServerMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

/// Decode a client JSON text frame. Rejects empty and oversized frames
/// before parsing.
pub fn decode_client_message(text: &str) -> Result<ClientMessage, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    if text.len() > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(text.len()));
    }
    serde_json::from_str(text).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Encode a client message. Used by test clients.
pub fn encode_client_message(msg: &ClientMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(msg).map_err(|e| ProtocolError::SerializeError(e.to_string()))
}

/// Decode a server JSON text frame. Used by test clients.
pub fn decode_server_message(text: &str) -> Result<ServerMessage, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    serde_json::from_str(text).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_decode() {
        let msg = decode_client_message(r#"{"type":"make_move","x":3,"y":-4}"#)
            .expect("should decode");
        assert_eq!(msg, ClientMessage::MakeMove { x: 3, y: -4 });

        let msg = decode_client_message(r#"{"type":"confirm_start"}"#).expect("should decode");
        assert_eq!(msg, ClientMessage::ConfirmStart);

        let msg = decode_client_message(r#"{"type":"verify_password","password":"hunter2"}"#)
            .expect("should decode");
        assert_eq!(
            msg,
            ClientMessage::VerifyPassword {
                password: "hunter2".to_string()
            }
        );
    }

    #[test]
    fn non_integer_coordinates_rejected() {
        for frame in [
            r#"{"type":"make_move","x":"3","y":4}"#,
            r#"{"type":"make_move","x":1.5,"y":4}"#,
            r#"{"type":"make_move","x":null,"y":4}"#,
            r#"{"type":"make_move","y":4}"#,
        ] {
            assert!(matches!(
                decode_client_message(frame),
                Err(ProtocolError::DeserializeError(_))
            ));
        }
    }

    #[test]
    fn unknown_type_rejected() {
        assert!(matches!(
            decode_client_message(r#"{"type":"launch_missiles"}"#),
            Err(ProtocolError::DeserializeError(_))
        ));
    }

    #[test]
    fn empty_message_rejected() {
        assert!(matches!(
            decode_client_message(""),
            Err(ProtocolError::EmptyMessage)
        ));
    }

    #[test]
    fn oversized_message_rejected() {
        let huge = format!(
            r#"{{"type":"verify_password","password":"{}"}}"#,
            "a".repeat(MAX_MESSAGE_SIZE)
        );
        assert!(matches!(
            decode_client_message(&huge),
            Err(ProtocolError::PayloadTooLarge(_))
        ));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let msg = decode_client_message(r#"{"type":"make_move","x":1,"y":2,"z":9}"#)
            .expect("should decode");
        assert_eq!(msg, ClientMessage::MakeMove { x: 1, y: 2 });
    }

    #[test]
    fn server_message_wire_shapes() {
        let encoded = encode_server_message(&ServerMessage::Timer { seconds: 30 })
            .expect("should encode");
        assert_eq!(encoded, r#"{"type":"timer","seconds":30}"#);

        let encoded = encode_server_message(&ServerMessage::GameStarted).expect("should encode");
        assert_eq!(encoded, r#"{"type":"game_started"}"#);

        let encoded = encode_server_message(&ServerMessage::LastMove { placed: None })
            .expect("should encode");
        assert_eq!(encoded, r#"{"type":"last_move","placed":null}"#);
    }

    #[test]
    fn server_messages_round_trip() {
        let messages = [
            ServerMessage::PasswordOk,
            ServerMessage::PasswordFail,
            ServerMessage::AssignRole {
                role: crate::player::Role::Spectator,
            },
            ServerMessage::Timer { seconds: 7 },
            ServerMessage::ReadyToStart,
            ServerMessage::WaitingForPlayers,
            ServerMessage::GameStarted,
        ];
        for msg in messages {
            let encoded = encode_server_message(&msg).expect("should encode");
            let decoded = decode_server_message(&encoded).expect("should decode");
            assert_eq!(decoded, msg);
        }
    }

    #[test]
    fn protocol_error_display() {
        assert_eq!(ProtocolError::EmptyMessage.to_string(), "empty message");
        assert_eq!(
            ProtocolError::PayloadTooLarge(9000).to_string(),
            "payload too large: 9000 bytes (max 8192)"
        );
    }
}
