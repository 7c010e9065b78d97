//! Interface de terminal do prepflow: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`RunProgress`] acompanha visualmente cada
//! célula de uma execução: a ingestão e um spinner por alvo de geração.

use std::time::Duration;

use console::Style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::state_machine::{OrchestratorState, TaskState, TaskStatus};
use crate::transport::TargetKind;

/// Indicador visual de progresso de uma execução no terminal.
pub struct RunProgress {
    _multi: MultiProgress,
    // Spinner da ingestão.
    ingest: ProgressBar,
    // Um spinner por alvo, na ordem de `TargetKind::ALL`.
    targets: Vec<(TargetKind, ProgressBar)>,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
}

impl RunProgress {
    /// Cria os spinners e retorna a instância de progresso.
    pub fn start(source_name: &str) -> Self {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:>10} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let spinner = |prefix: String| {
            let pb = multi.add(ProgressBar::new_spinner());
            pb.set_style(style.clone());
            pb.set_prefix(prefix);
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };

        let ingest = spinner("ingest".to_string());
        ingest.set_message(format!("{source_name}: pending"));
        let targets = TargetKind::ALL
            .into_iter()
            .map(|target| {
                let pb = spinner(target.to_string());
                pb.set_message("idle");
                (target, pb)
            })
            .collect();

        Self {
            _multi: multi,
            ingest,
            targets,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
        }
    }

    /// Atualiza todas as mensagens a partir de um snapshot.
    pub fn render(&self, state: &OrchestratorState) {
        self.ingest.set_message(self.describe(&state.ingest));
        for (target, pb) in &self.targets {
            if let Some(cell) = state.generation.get(target) {
                pb.set_message(self.describe(cell));
            }
        }
    }

    /// Finaliza os spinners e exibe o resultado de cada célula.
    pub fn finish(&self, state: &OrchestratorState) {
        self.render(state);
        self.ingest.finish();
        for (_, pb) in &self.targets {
            pb.finish();
        }

        let summary = if state.cancelled {
            self.yellow.apply_to("Run cancelled").to_string()
        } else if state.all_done() {
            let failed = state.failed_targets();
            if failed.is_empty() {
                self.green.apply_to("✓ All materials generated").to_string()
            } else {
                let names: Vec<&str> = failed.iter().map(TargetKind::as_str).collect();
                self.yellow
                    .apply_to(format!("✓ Finished with failures: {}", names.join(", ")))
                    .to_string()
            }
        } else {
            self.red.apply_to("✗ Run did not finish").to_string()
        };
        println!("  {summary}");
    }

    fn describe(&self, cell: &TaskState) -> String {
        match cell.status {
            TaskStatus::Idle => self.dim.apply_to("idle").to_string(),
            TaskStatus::Pending => self.yellow.apply_to("pending").to_string(),
            TaskStatus::Running => format!(
                "{} {}",
                self.yellow.apply_to("running"),
                cell.job_id.as_deref().unwrap_or_default()
            ),
            TaskStatus::Completed => format!(
                "{} {}",
                self.green.apply_to("✓ completed"),
                cell.result_artifact_id.as_deref().unwrap_or_default()
            ),
            TaskStatus::Failed => format!(
                "{} {}",
                self.red.apply_to("✗ failed"),
                cell.error.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// Imprime o snapshot final formatado em JSON.
pub fn print_snapshot(state: &OrchestratorState) {
    println!();
    println!("{}", Style::new().bold().apply_to("─── Final State ───"));
    println!(
        "{}",
        serde_json::to_string_pretty(state).unwrap_or_default()
    );
}
