//! Configuração da máquina de café carregada a partir de `coffee-machine.toml`.
//!
//! A struct [`CoffeeConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! A variável de ambiente `PORT` tem precedência sobre o arquivo.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::machine::{FixedBrewTime, MAX_BREW_SECONDS, MIN_BREW_SECONDS, Machine, RandomBrewTime};

/// Nome do arquivo de configuração procurado no diretório atual.
pub const DEFAULT_CONFIG_FILE: &str = "coffee-machine.toml";

/// Configuração de nível superior carregada de `coffee-machine.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoffeeConfig {
    /// Endereço IP em que o servidor escuta.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Porta HTTP do servidor.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Duração mínima de preparo, em segundos.
    #[serde(default = "default_min_brew_seconds")]
    pub min_brew_seconds: u64,

    /// Duração máxima de preparo, em segundos.
    #[serde(default = "default_max_brew_seconds")]
    pub max_brew_seconds: u64,

    /// Duração fixa de preparo em milissegundos; substitui o intervalo aleatório.
    #[serde(default)]
    pub fixed_brew_millis: Option<u64>,

    /// Filtro de log (sintaxe do `EnvFilter`) quando `RUST_LOG` não está definido.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// URL do servidor usada pelos subcomandos cliente.
    #[serde(default = "default_server_url")]
    pub server_url: String,
}

// Valor padrão para o endereço: todas as interfaces.
fn default_bind_address() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

// Valor padrão para a porta: 8080.
fn default_port() -> u16 {
    8080
}

fn default_min_brew_seconds() -> u64 {
    MIN_BREW_SECONDS
}

fn default_max_brew_seconds() -> u64 {
    MAX_BREW_SECONDS
}

// Valor padrão para o nível de log: "info".
fn default_log_level() -> String {
    "info".to_string()
}

fn default_server_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

impl Default for CoffeeConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            min_brew_seconds: default_min_brew_seconds(),
            max_brew_seconds: default_max_brew_seconds(),
            fixed_brew_millis: None,
            log_level: default_log_level(),
            server_url: default_server_url(),
        }
    }
}

impl CoffeeConfig {
    /// Carrega a configuração de `path`, ou de `coffee-machine.toml` no
    /// diretório atual. Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path.is_some();
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<CoffeeConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else if explicit {
            bail!("config file not found: {}", path.display());
        } else {
            Self::default()
        };

        // Variável de ambiente tem precedência sobre o arquivo para a porta.
        config.apply_port_override(std::env::var("PORT").ok().as_deref())?;
        config.validate()?;
        Ok(config)
    }

    /// Aplica o valor de `PORT`, ignorando valores vazios.
    pub fn apply_port_override(&mut self, port: Option<&str>) -> Result<()> {
        if let Some(port) = port
            && !port.is_empty()
        {
            self.port = port
                .parse()
                .with_context(|| format!("invalid PORT value: {port}"))?;
        }
        Ok(())
    }

    /// Rejeita intervalos de preparo invertidos.
    pub fn validate(&self) -> Result<()> {
        if self.min_brew_seconds > self.max_brew_seconds {
            bail!(
                "min_brew_seconds ({}) must not exceed max_brew_seconds ({})",
                self.min_brew_seconds,
                self.max_brew_seconds
            );
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Constrói uma máquina ociosa com a estratégia de preparo configurada.
    pub fn build_machine(&self) -> Machine {
        match self.fixed_brew_millis {
            Some(ms) => Machine::with_brew_time(FixedBrewTime::from_millis(ms)),
            None => Machine::with_brew_time(RandomBrewTime::new(
                self.min_brew_seconds,
                self.max_brew_seconds,
            )),
        }
    }
}
