use clap::Parser;
use inference::{InferenceBackend, InferenceConfig, LabelTable, OrtBackend};
use serde_json::{Map, Value};

/// Print the class labels a detection model was trained with.
#[derive(Parser, Debug)]
#[command(name = "inspect")]
#[command(about = "Print the label table of an ONNX detection model", long_about = None)]
struct Args {
    /// Model file; defaults to $MODEL_PATH, then last.onnx
    #[arg(long)]
    model: Option<String>,

    /// Plain labels file (one name per line) overriding the model metadata
    #[arg(long)]
    labels: Option<String>,

    /// Print a JSON object instead of `id: name` lines
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = InferenceConfig::from_env()?;
    if let Some(model) = args.model {
        config.model_path = model;
    }
    if args.labels.is_some() {
        config.labels_path = args.labels;
    }

    let backend = OrtBackend::load_model(&config)?;
    let labels = backend.labels();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&labels_json(labels))?);
    } else {
        print!("{}", labels_text(labels));
    }

    Ok(())
}

fn labels_text(labels: &LabelTable) -> String {
    labels
        .iter()
        .map(|(id, name)| format!("{}: {}\n", id, name))
        .collect()
}

fn labels_json(labels: &LabelTable) -> Value {
    let map: Map<String, Value> = labels
        .iter()
        .map(|(id, name)| (id.to_string(), Value::String(name.to_string())))
        .collect();
    Value::Object(map)
}
