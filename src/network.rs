use crate::classifier::{to_probabilities, top_k, Classifier, Prediction};
use crate::config::{networks_dir, ExtraArgs};
use crate::frame::Frame;
use crate::labels::{load_labels, synthesize_labels};
use crate::profiler::{Profiler, Stage};
use anyhow::{bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_onnx::{onnx, read_file, simple_eval};
use hf_hub::api::sync::Api;
use image::imageops::{self, FilterType};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];
const DEFAULT_INPUT_SIZE: u32 = 224;

/// Networks known without a manifest entry, with a short description.
pub const BUILTIN_NETWORKS: [(&str, &str); 10] = [
    ("alexnet", "AlexNet"),
    ("googlenet", "GoogleNet (default)"),
    ("googlenet-12", "GoogleNet trained on ILSVRC12"),
    ("resnet-18", "ResNet-18"),
    ("resnet-50", "ResNet-50"),
    ("resnet-101", "ResNet-101"),
    ("resnet-152", "ResNet-152"),
    ("vgg-16", "VGG-16"),
    ("vgg-19", "VGG-19"),
    ("inception-v4", "Inception-v4"),
];

pub fn usage() -> String {
    let mut text = String::from(
        "imageNet arguments:
  --network=NETWORK     pre-trained model to load, one of the following:\n",
    );
    for (name, desc) in BUILTIN_NETWORKS {
        text.push_str(&format!("                            * {name:<14}{desc}\n"));
    }
    text.push_str(
        "                        networks live under $IMAGENET_NETWORKS_DIR (default ./networks)
                        as <name>/model.onnx and <name>/labels.txt, or as listed in models.json
  --model=MODEL         path to custom ONNX model to load
  --labels=LABELS       path to text file containing the labels for each class
  --input-blob=INPUT    name of the input layer (default is the first graph input)
  --output-blob=OUTPUT  name of the output layer (default is the first graph output)
  --threshold=VALUE     minimum confidence of reported classes (default is 0.0)
  --model-repo=REPO     Hugging Face repo to fetch missing model files from
                        (default $IMAGENET_MODEL_REPO)
",
    );
    text
}

/// Where a network's files live and how its input is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkDescriptor {
    pub name: String,
    pub model: PathBuf,
    pub labels: Option<PathBuf>,
    /// Labels were named explicitly, so a missing file is an error.
    pub labels_required: bool,
    pub input_blob: Option<String>,
    pub output_blob: Option<String>,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub threshold: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ManifestEntry {
    model: Option<PathBuf>,
    labels: Option<PathBuf>,
    input_blob: Option<String>,
    output_blob: Option<String>,
    mean: Option<[f32; 3]>,
    std: Option<[f32; 3]>,
}

fn load_manifest(dir: &Path) -> Result<HashMap<String, ManifestEntry>> {
    let path = dir.join("models.json");
    match fs::read(&path) {
        Ok(data) => serde_json::from_slice(&data)
            .with_context(|| format!("failed to parse {}", path.display())),
        Err(_) => Ok(HashMap::new()),
    }
}

/// Resolves `--network` and the forwarded model flags to file locations.
pub fn resolve_network(network: &str, extra: &ExtraArgs) -> Result<NetworkDescriptor> {
    resolve_network_in(&networks_dir(), network, extra)
}

pub fn resolve_network_in(dir: &Path, network: &str, extra: &ExtraArgs) -> Result<NetworkDescriptor> {
    let threshold = extra.parsed_or("threshold", 0.0f32)?;
    let mut desc = if let Some(model) = extra.value("model") {
        let model = PathBuf::from(model);
        let name = model
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| network.to_string());
        NetworkDescriptor {
            name,
            model,
            labels: extra.value("labels").map(PathBuf::from),
            labels_required: extra.value("labels").is_some(),
            input_blob: None,
            output_blob: None,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            threshold,
        }
    } else {
        let mut manifest = load_manifest(dir)?;
        let name = network.to_lowercase();
        let entry = manifest.remove(&name);
        if entry.is_none() && !BUILTIN_NETWORKS.iter().any(|(n, _)| *n == name) {
            warn!(network = %name, "network is not a built-in, trying {}/{name}", dir.display());
        }
        let entry = entry.unwrap_or_default();
        let labels_required = entry.labels.is_some() || extra.value("labels").is_some();
        NetworkDescriptor {
            model: dir.join(entry.model.unwrap_or_else(|| Path::new(&name).join("model.onnx"))),
            labels: Some(match extra.value("labels") {
                Some(l) => PathBuf::from(l),
                None => dir.join(entry.labels.unwrap_or_else(|| Path::new(&name).join("labels.txt"))),
            }),
            labels_required,
            input_blob: entry.input_blob,
            output_blob: entry.output_blob,
            mean: entry.mean.unwrap_or(IMAGENET_MEAN),
            std: entry.std.unwrap_or(IMAGENET_STD),
            threshold,
            name,
        }
    };
    if let Some(blob) = extra.value("input-blob") {
        desc.input_blob = Some(blob.to_string());
    }
    if let Some(blob) = extra.value("output-blob") {
        desc.output_blob = Some(blob.to_string());
    }
    Ok(desc)
}

/// Returns `path`, downloading its file name from `repo` when it is missing.
fn fetch_missing(path: &Path, repo: Option<&str>) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    let Some(repo) = repo else {
        bail!("{} not found", path.display());
    };
    let filename = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?
        .to_string_lossy()
        .into_owned();
    info!(%repo, %filename, "downloading");
    let fetched = Api::new()
        .and_then(|api| api.model(repo.to_string()).get(&filename))
        .with_context(|| format!("failed to download {filename} from {repo}"))?;
    Ok(fetched)
}

/// ONNX image classifier evaluated on the CPU with candle.
pub struct OnnxClassifier {
    model: onnx::ModelProto,
    name: String,
    model_file: String,
    input_name: String,
    output_name: String,
    input_size: (u32, u32),
    mean: Tensor,
    std: Tensor,
    threshold: f32,
    labels: Vec<String>,
    synthetic_labels: bool,
    device: Device,
    profiler: Profiler,
}

impl OnnxClassifier {
    pub fn load(desc: &NetworkDescriptor, repo: Option<&str>) -> Result<Self> {
        let model_path = fetch_missing(&desc.model, repo)?;
        info!(network = %desc.name, path = %model_path.display(), "loading network");
        let mut model = read_file(&model_path)
            .with_context(|| format!("failed to load model {}", model_path.display()))?;
        split_pool_padding(&mut model);

        let graph = model.graph.as_ref().context("model graph missing")?;
        let input_name = match &desc.input_blob {
            Some(name) => name.clone(),
            None => first_input(graph).context("model has no inputs")?,
        };
        let output_name = match &desc.output_blob {
            Some(name) => name.clone(),
            None => graph
                .output
                .first()
                .map(|o| o.name.clone())
                .context("model has no outputs")?,
        };
        let input_size = input_dims(graph, &input_name).unwrap_or((DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE));
        debug!(input = %input_name, output = %output_name, ?input_size, "network bindings");

        let (labels, synthetic_labels) = match &desc.labels {
            Some(path) => match fetch_missing(path, repo) {
                Ok(p) => (load_labels(&p)?, false),
                Err(e) if desc.labels_required => return Err(e),
                Err(_) => {
                    warn!(path = %path.display(), "labels not found, using class numbers");
                    (Vec::new(), true)
                }
            },
            None => (Vec::new(), true),
        };
        let labels = match output_classes(graph, &output_name) {
            Some(count) if synthetic_labels => synthesize_labels(count),
            _ => labels,
        };

        let device = Device::Cpu;
        let mean = Tensor::from_slice(&desc.mean[..], (3, 1, 1), &device)?;
        let std = Tensor::from_slice(&desc.std[..], (3, 1, 1), &device)?;
        let model_file = model_path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            model,
            name: desc.name.clone(),
            model_file,
            input_name,
            output_name,
            input_size,
            mean,
            std,
            threshold: desc.threshold,
            labels,
            synthetic_labels,
            device,
            profiler: Profiler::default(),
        })
    }

    fn preprocess(&self, frame: &Frame) -> Result<Tensor> {
        let (w, h) = self.input_size;
        let resized = imageops::resize(frame.image(), w, h, FilterType::Triangle);
        let tensor = Tensor::from_vec(resized.into_raw(), (h as usize, w as usize, 3), &self.device)?
            .permute((2, 0, 1))?
            .to_dtype(DType::F32)?
            .affine(1.0 / 255.0, 0.0)?
            .broadcast_sub(&self.mean)?
            .broadcast_div(&self.std)?
            .unsqueeze(0)?;
        Ok(tensor)
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&mut self, frame: &Frame, k: usize) -> Result<Vec<Prediction>> {
        self.profiler.begin(Stage::PreProcess);
        let input = self.preprocess(frame)?;
        self.profiler.end(Stage::PreProcess);

        self.profiler.begin(Stage::Network);
        let mut inputs = HashMap::new();
        inputs.insert(self.input_name.clone(), input);
        let mut outputs = simple_eval(&self.model, inputs)?;
        let output = outputs
            .remove(&self.output_name)
            .with_context(|| format!("model output {} missing", self.output_name))?;
        self.profiler.end(Stage::Network);

        self.profiler.begin(Stage::PostProcess);
        let scores = output.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
        let scores = to_probabilities(scores);
        if self.synthetic_labels && self.labels.len() != scores.len() {
            self.labels = synthesize_labels(scores.len());
        }
        let predictions = top_k(&scores, k, self.threshold);
        self.profiler.end(Stage::PostProcess);
        Ok(predictions)
    }

    fn class_label(&self, class_id: u32) -> Option<&str> {
        self.labels.get(class_id as usize).map(String::as_str)
    }

    fn num_classes(&self) -> usize {
        self.labels.len()
    }

    fn network_name(&self) -> &str {
        &self.name
    }

    fn network_fps(&self) -> f32 {
        self.profiler.network_fps()
    }

    fn print_profiler_times(&self) {
        self.profiler.report(&self.model_file);
    }
}

/// First graph input that is not a weight initializer.
fn first_input(graph: &onnx::GraphProto) -> Option<String> {
    let weights: HashSet<&str> = graph.initializer.iter().map(|t| t.name.as_str()).collect();
    graph
        .input
        .iter()
        .find(|i| !weights.contains(i.name.as_str()))
        .map(|i| i.name.clone())
}

/// Declared dimensions of a graph value; symbolic dimensions are `-1`.
fn value_dims(values: &[onnx::ValueInfoProto], name: &str) -> Option<Vec<i64>> {
    use onnx::tensor_shape_proto::dimension::Value;
    use onnx::type_proto::Value as TypeValue;

    let value = values.iter().find(|v| v.name == name)?;
    let TypeValue::TensorType(tensor) = value.r#type.as_ref()?.value.as_ref()? else {
        return None;
    };
    let dims = tensor
        .shape
        .as_ref()?
        .dim
        .iter()
        .map(|d| match &d.value {
            Some(Value::DimValue(v)) => *v,
            _ => -1,
        })
        .collect();
    Some(dims)
}

/// Width and height of an NCHW input, when the graph declares them.
fn input_dims(graph: &onnx::GraphProto, name: &str) -> Option<(u32, u32)> {
    match value_dims(&graph.input, name)?.as_slice() {
        [_, _, h, w] if *h > 0 && *w > 0 => Some((*w as u32, *h as u32)),
        _ => None,
    }
}

/// Number of classes in the output, taken from its last declared dimension.
fn output_classes(graph: &onnx::GraphProto, name: &str) -> Option<usize> {
    let dims = value_dims(&graph.output, name)?;
    dims.last().filter(|n| **n > 0).map(|n| *n as usize)
}

/// Moves MaxPool padding into a separate reflect-mode Pad node, since the
/// evaluator only handles unpadded pooling.
fn split_pool_padding(model: &mut onnx::ModelProto) {
    let Some(graph) = model.graph.as_mut() else {
        return;
    };
    let mut nodes = Vec::with_capacity(graph.node.len());
    for mut node in std::mem::take(&mut graph.node) {
        if node.op_type == "MaxPool" {
            let pads = node
                .attribute
                .iter_mut()
                .find(|a| a.name == "pads" && a.ints.len() == 4 && a.ints.iter().any(|&v| v != 0))
                .map(|a| std::mem::replace(&mut a.ints, vec![0; 4]));
            if let Some(pads) = pads {
                let pads_name = format!("{}_pads", node.name);
                graph.initializer.push(onnx::TensorProto {
                    name: pads_name.clone(),
                    dims: vec![8],
                    data_type: onnx::tensor_proto::DataType::Int64 as i32,
                    int64_data: vec![0, 0, pads[0], pads[1], 0, 0, pads[2], pads[3]],
                    ..Default::default()
                });
                let padded = format!("{}_padded", node.name);
                nodes.push(onnx::NodeProto {
                    input: vec![node.input[0].clone(), pads_name],
                    output: vec![padded.clone()],
                    name: format!("{}_pad", node.name),
                    op_type: "Pad".to_string(),
                    attribute: vec![onnx::AttributeProto {
                        name: "mode".to_string(),
                        r#type: onnx::attribute_proto::AttributeType::String as i32,
                        s: b"reflect".to_vec(),
                        ..Default::default()
                    }],
                    ..Default::default()
                });
                node.input[0] = padded;
            }
        }
        nodes.push(node);
    }
    graph.node = nodes;
}
