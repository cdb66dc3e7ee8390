//! Interface de linha de comando da máquina de café baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (serve, start,
//! retrieve, status, history, brew, health, products) e flags globais
//! (--server, --config, --verbose).

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Máquina de café — um único recurso, um job por vez.
#[derive(Debug, Parser)]
#[command(name = "coffee-machine", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// URL do servidor para os subcomandos cliente.
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Caminho do arquivo de configuração (padrão: ./coffee-machine.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inicia o servidor HTTP da máquina.
    Serve {
        /// Porta HTTP (sobrepõe configuração e `PORT`).
        #[arg(long)]
        port: Option<u16>,

        /// Endereço IP de escuta.
        #[arg(long)]
        bind: Option<IpAddr>,
    },

    /// Envia um job de preparo e imprime o resultado.
    Start {
        /// Produto a preparar (ex.: COFFEE, ESPRESSO).
        product: String,

        /// Identificador escolhido pelo cliente; gerado pelo servidor se omitido.
        #[arg(long)]
        job_id: Option<String>,
    },

    /// Retira um job já pronto.
    Retrieve {
        /// Identificador do job.
        job_id: String,
    },

    /// Mostra o estado atual da máquina.
    Status,

    /// Lista todos os jobs na ordem de submissão.
    History,

    /// Envia um job, aguarda o preparo e retira o resultado.
    Brew {
        /// Produto a preparar.
        product: String,

        /// Identificador escolhido pelo cliente.
        #[arg(long)]
        job_id: Option<String>,
    },

    /// Verifica se o servidor está respondendo (`/healthz`).
    Health,

    /// Lista os produtos suportados.
    Products,
}
