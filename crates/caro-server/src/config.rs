use serde::Deserialize;

const CONFIG_PATH: &str = "caro.toml";

/// Server configuration, read from `caro.toml` with environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub listen_addr: String,
    pub auth: AuthConfig,
    pub game: GameConfig,
    pub limits: LimitsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:3001".to_string(),
            auth: AuthConfig::default(),
            game: GameConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Room password. `None` leaves the gate open.
    pub password: Option<String>,
}

/// Rules of the room.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Side length of the eagerly rendered working area.
    pub board_size: i32,
    /// Seconds each player gets per turn.
    pub turn_secs: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: 20,
            turn_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Concurrent WebSocket connections accepted before returning 503.
    pub max_connections: usize,
    /// Outbound frames buffered per connection before drops.
    pub message_buffer: usize,
    /// Inbound frames accepted per second per connection.
    pub messages_per_sec: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_connections: 64,
            message_buffer: 256,
            messages_per_sec: 20.0,
        }
    }
}

impl ServerConfig {
    /// Load from `caro.toml` if present, then apply environment overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string(CONFIG_PATH) {
            Ok(contents) => match toml::from_str::<ServerConfig>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {CONFIG_PATH}");
                    config
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {CONFIG_PATH}: {e}, using defaults");
                    Self::default()
                },
            },
            Err(_) => {
                tracing::info!("No {CONFIG_PATH} found, using defaults");
                Self::default()
            },
        };

        if let Ok(addr) = std::env::var("CARO_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(password) = std::env::var("CARO_PASSWORD")
            && !password.is_empty()
        {
            config.auth.password = Some(password);
        }
        if let Ok(size) = std::env::var("CARO_BOARD_SIZE")
            && let Ok(size) = size.parse()
        {
            config.game.board_size = size;
        }
        if let Ok(secs) = std::env::var("CARO_TURN_SECS")
            && let Ok(secs) = secs.parse()
        {
            config.game.turn_secs = secs;
        }

        config
    }

    /// Exit with an error for configurations the server cannot run with;
    /// warn about suspicious but workable ones.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(addr = %self.listen_addr, "listen_addr is not a valid socket address");
            std::process::exit(1);
        }
        if self.game.board_size <= 0 {
            tracing::error!(size = self.game.board_size, "board_size must be positive");
            std::process::exit(1);
        }
        if self.game.turn_secs == 0 {
            tracing::error!("turn_secs must be positive");
            std::process::exit(1);
        }
        if self.limits.max_connections == 0 || self.limits.message_buffer == 0 {
            tracing::error!("connection limits must be positive");
            std::process::exit(1);
        }
        if self.limits.messages_per_sec <= 0.0 {
            tracing::error!("messages_per_sec must be positive");
            std::process::exit(1);
        }
        if self.game.board_size < caro_core::board::WIN_LEN as i32 {
            tracing::warn!(
                size = self.game.board_size,
                "board_size is smaller than a winning run; games can only be won off the working area"
            );
        }
        if let Some(password) = &self.auth.password
            && password.len() < 6
        {
            tracing::warn!("Room password is shorter than 6 characters");
        }
    }
}
