//! Interface de terminal da máquina de café — spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`BrewProgress`] acompanha visualmente
//! o preparo de um job no terminal.

use chrono::{DateTime, Utc};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::machine::{Job, MachineState};

/// Indicador visual de progresso para o preparo de um job no terminal.
///
/// Exibe um spinner animado durante o preparo e mensagens coloridas para
/// sucesso (verde), falha (vermelho) e espera (amarelo).
pub struct BrewProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para mensagens de espera.
    yellow: Style,
}

impl BrewProgress {
    /// Inicia o spinner para o produto e retorna a instância de progresso.
    pub fn start(product: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        // Template fixo e válido; se falhar, o spinner usa o estilo padrão.
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Submitting {product}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a mensagem com o tempo restante até o job ficar pronto.
    pub fn brewing(&self, job: &Job, now: DateTime<Utc>) {
        self.pb.set_message(format!(
            "Brewing {} ({}) ready in {}s",
            job.product,
            job.job_id,
            remaining_secs(job, now)
        ));
    }

    /// Exibe uma mensagem de espera enquanto o servidor ainda recusa a retirada.
    pub fn waiting(&self, reason: &str) {
        self.pb
            .println(format!("  {} {reason}", self.yellow.apply_to("…")));
    }

    /// Finaliza o spinner e exibe o job retirado em verde.
    pub fn complete(&self, job: &Job) {
        self.pb.finish_and_clear();
        println!(
            "  {} {} ready ({})",
            self.green.apply_to("✓"),
            job.product,
            job.job_id
        );
    }

    /// Finaliza o spinner e exibe a falha em vermelho.
    pub fn fail(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }
}

/// Segundos inteiros restantes até `job_ready`, nunca negativo.
pub fn remaining_secs(job: &Job, now: DateTime<Utc>) -> i64 {
    (job.job_ready - now).num_seconds().max(0)
}

/// Imprime um job formatado em JSON com cabeçalho colorido.
pub fn print_job(job: &Job) {
    let style = if job.job_retrieved.is_some() {
        Style::new().green().bold()
    } else {
        Style::new().yellow()
    };
    println!("{}", style.apply_to(format!("─── Job {} ───", job.job_id)));
    println!("{}", serde_json::to_string_pretty(job).unwrap_or_default());
}

/// Imprime o estado da máquina com cor por estado.
pub fn print_state(state: MachineState) {
    let style = match state {
        MachineState::Available => Style::new().green().bold(),
        MachineState::Brewing => Style::new().yellow(),
        MachineState::Blocked => Style::new().red(),
    };
    println!("{} ({})", style.apply_to(state), state.code());
}

/// Confirma que o servidor respondeu ao health check.
pub fn print_healthy(server: &str) {
    println!("{} {server} ok", Style::new().green().bold().apply_to("✓"));
}

/// Imprime o histórico como tabela simples.
pub fn print_history(jobs: &[Job]) {
    if jobs.is_empty() {
        println!("No jobs yet.");
        return;
    }
    let dim = Style::new().dim();
    for job in jobs {
        let retrieved = job
            .job_retrieved
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}  {:<18}  ready {}  retrieved {}",
            job.job_id,
            job.product,
            dim.apply_to(job.job_ready.to_rfc3339()),
            dim.apply_to(retrieved)
        );
    }
}
