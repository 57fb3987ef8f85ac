use std::path::PathBuf;

use vireo_ast::TypeExpr;
use vireo_types::{
    atom, atoms, closed_map, dynamic, integer, open_map, optional, required, Descr, Symbol,
};

struct QuotedMetric {
    name: &'static str,
    rendered: String,
    disjuncts: usize,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let metrics = vec![
        measure("atom_union", atoms(["ok", "error"]).union(&integer())),
        measure("negated_atoms", atom().difference(&atoms(["ok"]))),
        measure(
            "map_union",
            closed_map([(Symbol::new("a"), required(integer()))])
                .union(&closed_map([(Symbol::new("a"), optional(integer()))])),
        ),
        measure(
            "extra_keys_required",
            open_map([(Symbol::new("a"), required(integer()))])
                .difference(&closed_map([(Symbol::new("a"), required(integer()))])),
        ),
        measure("gradual_atom", dynamic().union(&atom())),
    ];
    let json = render_metrics_json(&metrics);

    if let Some(path) = std::env::args().nth(1) {
        let path = PathBuf::from(path);
        std::fs::write(&path, json)
            .map_err(|err| format!("failed to write `{}`: {err}", path.display()))?;
    } else {
        print!("{json}");
    }
    Ok(())
}

fn measure(name: &'static str, descr: Descr) -> QuotedMetric {
    let quoted = descr.to_quoted();
    QuotedMetric {
        name,
        rendered: descr.to_quoted_string(),
        disjuncts: disjunct_count(&quoted),
    }
}

fn disjunct_count(expr: &TypeExpr) -> usize {
    match expr {
        TypeExpr::Union(members) => members.len(),
        _ => 1,
    }
}

fn render_metrics_json(metrics: &[QuotedMetric]) -> String {
    let mut out = String::from("{\n  \"types\": [\n");
    for (i, metric) in metrics.iter().enumerate() {
        out.push_str(&format!(
            "    {{\"name\": \"{}\", \"disjuncts\": {}, \"rendered\": \"{}\"}}",
            metric.name,
            metric.disjuncts,
            metric.rendered.replace('"', "\\\"")
        ));
        out.push_str(if i + 1 < metrics.len() { ",\n" } else { "\n" });
    }
    out.push_str("  ]\n}\n");
    out
}
