//! Formatted terminal output.
//!
//! Formatting stays in one place so the fitting code remains clean and output
//! changes are localized.

use crate::domain::{FitConfig, FitOutcome, GroupedTable, ModelRun, ModelSpec, QualityRow};
use crate::fit::selection::Selection;
use crate::report::CoefPivot;

/// Dataset overview plus one line per (model, group) attempt.
pub fn format_run_summary(grouped: &GroupedTable, runs: &[ModelRun], config: &FitConfig) -> String {
    let mut out = String::new();

    out.push_str("=== sensorfit - nested model fits ===\n");
    out.push_str(&format!("Input: {}\n", config.csv_path.display()));
    out.push_str(&format!(
        "Sensors: {} | observations: {} | elapsed unit: {}\n",
        grouped.len(),
        grouped.total_rows(),
        config.time_unit.label()
    ));

    let ok = runs.iter().filter(|r| r.outcome.is_success()).count();
    out.push_str(&format!("Fits: {ok}/{} succeeded\n", runs.len()));

    out.push_str("\nFit attempts:\n");
    for run in runs {
        match &run.outcome {
            FitOutcome::Success(fit) => out.push_str(&format!(
                "  ok   {:<12} {:<16} RMSE={:.4} BIC={:.3} iter={}\n",
                run.model_id,
                truncate(&run.group_id, 16),
                fit.rmse,
                fit.bic,
                fit.iterations
            )),
            FitOutcome::Failure(reason) => out.push_str(&format!(
                "  FAIL {:<12} {:<16} {reason}\n",
                run.model_id,
                truncate(&run.group_id, 16)
            )),
        }
    }

    out
}

/// Quality table (one row per successful fit).
pub fn format_quality(rows: &[QualityRow]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<12} {:<16} {:>5} {:>12} {:>10} {:>12} {:>12}",
            "model", "sensor", "n", "sse", "rmse", "aic", "bic"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<12} {:-<16} {:-<5} {:-<12} {:-<10} {:-<12} {:-<12}\n",
        "", "", "", "", "", "", ""
    ));

    for r in rows {
        out.push_str(
            format!(
                "{:<12} {:<16} {:>5} {:>12.5} {:>10.5} {:>12.3} {:>12.3}",
                r.model_id,
                truncate(&r.group_id, 16),
                r.n,
                r.sse,
                r.rmse,
                r.aic,
                r.bic
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Pivoted coefficient table.
pub fn format_coefficients(pivot: &CoefPivot) -> String {
    let mut out = String::new();
    let mut header = format!("{:<12} {:<16}", "model", "sensor");
    for p in &pivot.params {
        header.push_str(&format!(" {p:>12}"));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    for (model, group, cells) in &pivot.rows {
        let mut line = format!("{:<12} {:<16}", model, truncate(group, 16));
        for c in cells {
            line.push_str(&format!(" {:>12}", fmt_opt(*c)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Best model per sensor.
pub fn format_selection(selection: &Selection) -> String {
    let mut out = String::new();
    out.push_str("Best model per sensor (BIC):\n");
    for g in &selection.groups {
        out.push_str(&format!(
            "* {:<16} {:<12} params={}\n",
            truncate(&g.group_id, 16),
            g.best.model_id,
            fmt_vec(&g.best.fit.params)
        ));
        let others: Vec<String> = g
            .candidates
            .iter()
            .map(|(model, bic)| format!("{model}={bic:.3}"))
            .collect();
        out.push_str(&format!("    BIC: {}\n", others.join(" ")));
    }
    for id in &selection.skipped {
        out.push_str(&format!("  (no fit) {id}\n"));
    }
    out
}

/// Model catalogue with formulas and initial guesses.
pub fn format_models(specs: &[ModelSpec]) -> String {
    let mut out = String::new();
    for spec in specs {
        let names = spec.kind.param_names().join(", ");
        out.push_str(&format!(
            "{:<12} {:<18} f(t) = {}\n             params [{names}] start {}\n",
            spec.id,
            spec.kind.display_name(),
            spec.kind.formula(),
            fmt_vec(&spec.initial)
        ));
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => format!("{x:.6}"),
        _ => "-".to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelKind;

    #[test]
    fn truncate_marks_cut_names() {
        assert_eq!(truncate("short", 16), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
    }

    #[test]
    fn coefficient_table_shows_missing_params_as_dash() {
        let pivot = CoefPivot {
            params: vec!["a".to_string(), "tau".to_string()],
            rows: vec![("diffusion".to_string(), "s1".to_string(), vec![Some(1.5), None])],
        };
        let text = format_coefficients(&pivot);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("tau"));
        assert!(lines[1].contains("1.500000"));
        assert!(lines[1].trim_end().ends_with('-'));
    }

    #[test]
    fn selection_lists_candidate_bics() {
        use crate::domain::{FittedRun, ModelFit};
        use crate::fit::selection::GroupSelection;

        let best = FittedRun {
            model_id: "diffusion".to_string(),
            group_id: "s1".to_string(),
            fit: ModelFit {
                kind: ModelKind::Diffusion,
                params: vec![2.0, 0.5],
                std_errors: vec![0.1, 0.1],
                covariance: vec![vec![0.01, 0.0], vec![0.0, 0.01]],
                residuals: vec![],
                sse: 0.2,
                rmse: 0.1,
                aic: 3.0,
                bic: 4.5,
                n: 20,
                iterations: 6,
            },
        };
        let selection = Selection {
            groups: vec![GroupSelection {
                group_id: "s1".to_string(),
                best,
                candidates: vec![("diffusion".to_string(), 4.5), ("convection".to_string(), 4.0)],
            }],
            skipped: vec!["s2".to_string()],
        };
        let text = format_selection(&selection);
        assert!(text.contains("diffusion=4.500 convection=4.000"), "{text}");
        assert!(text.contains("(no fit) s2"));
    }

    #[test]
    fn model_catalogue_lists_every_model() {
        let specs: Vec<ModelSpec> = ModelKind::ALL.iter().map(|&k| ModelSpec::new(k)).collect();
        let text = format_models(&specs);
        for k in ModelKind::ALL {
            assert!(text.contains(k.formula()), "missing {}", k.id());
        }
    }
}
