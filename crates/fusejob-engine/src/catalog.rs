//! Strategy catalog: templates in, fully resolved invocations out.
//!
//! Each [`StrategyTemplate`] is a data record. Resolution substitutes the
//! job's paths into every placeholder and appends option-driven arguments
//! to every strategy, so an option holds whichever strategy wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use fusejob_config::{StrategyTemplate, ToolConfig};
use fusejob_types::JobOptions;

use crate::error::CatalogError;

/// A runnable invocation with no placeholders left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    /// Strategy name.
    pub name: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Variables set for this process only.
    pub env: BTreeMap<String, String>,
    /// Where this strategy is expected to write its result.
    pub output: PathBuf,
}

impl InvocationSpec {
    /// Shell-like rendering for logs and reports.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// `KEY=value` pairs, for reports.
    pub fn env_pairs(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }
}

fn quote(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Values available to placeholder substitution for one job.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub python: String,
    pub tool_dir: PathBuf,
    pub entry: PathBuf,
    pub source: PathBuf,
    pub target: PathBuf,
    pub output: PathBuf,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
}

impl StrategyContext {
    /// Context for a job staged in `work_dir`.
    pub fn new(tool: &ToolConfig, work_dir: &Path, source: &Path, target: &Path, output: &Path) -> Self {
        Self {
            python: tool.python.clone(),
            tool_dir: tool.tool_dir.clone(),
            entry: tool.entry_path(),
            source: source.to_path_buf(),
            target: target.to_path_buf(),
            output: output.to_path_buf(),
            output_dir: output
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| work_dir.to_path_buf()),
            work_dir: work_dir.to_path_buf(),
        }
    }

    /// Context with symbolic job paths, for showing the catalog without a job.
    pub fn preview(tool: &ToolConfig) -> Self {
        let work_dir = PathBuf::from("<work_dir>");
        Self::new(
            tool,
            &work_dir,
            &work_dir.join("source.jpg"),
            &work_dir.join("target.mp4"),
            &work_dir.join("output").join("output.mp4"),
        )
    }

    fn lookup(&self, key: &str) -> Option<String> {
        let value = match key {
            "python" => return Some(self.python.clone()),
            "tool_dir" => &self.tool_dir,
            "entry" => &self.entry,
            "source" => &self.source,
            "target" => &self.target,
            "output" => &self.output,
            "output_dir" => &self.output_dir,
            "work_dir" => &self.work_dir,
            _ => return None,
        };
        Some(value.display().to_string())
    }

    /// Substitute placeholders in `value`. `{{` and `}}` are literal braces.
    pub fn substitute(&self, strategy: &str, value: &str) -> Result<String, CatalogError> {
        let mut out = String::with_capacity(value.len());
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    out.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut key = String::new();
                    let mut closed = false;
                    for k in chars.by_ref() {
                        if k == '}' {
                            closed = true;
                            break;
                        }
                        key.push(k);
                    }
                    if !closed {
                        return Err(CatalogError::Unterminated {
                            strategy: strategy.to_string(),
                            value: value.to_string(),
                        });
                    }
                    match self.lookup(key.trim()) {
                        Some(v) => out.push_str(&v),
                        None => {
                            return Err(CatalogError::UnresolvedPlaceholder {
                                strategy: strategy.to_string(),
                                placeholder: key,
                            });
                        }
                    }
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}

/// The ordered set of templates plus option-driven extras.
#[derive(Debug, Clone)]
pub struct StrategyCatalog {
    templates: Vec<StrategyTemplate>,
    enhancement_args: Vec<String>,
}

impl StrategyCatalog {
    pub fn new(templates: Vec<StrategyTemplate>) -> Self {
        Self {
            templates,
            enhancement_args: Vec::new(),
        }
    }

    /// Args appended to every strategy when the job enables enhancement.
    pub fn with_enhancement_args(mut self, args: Vec<String>) -> Self {
        self.enhancement_args = args;
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Resolve every template, preserving catalog order.
    pub fn build(
        &self,
        ctx: &StrategyContext,
        options: &JobOptions,
    ) -> Result<Vec<InvocationSpec>, CatalogError> {
        if self.templates.is_empty() {
            return Err(CatalogError::Empty);
        }

        let extras: &[String] = if options.enable_enhancement {
            &self.enhancement_args
        } else {
            &[]
        };

        self.templates
            .iter()
            .map(|template| resolve(template, ctx, extras))
            .collect()
    }
}

fn resolve(
    template: &StrategyTemplate,
    ctx: &StrategyContext,
    extras: &[String],
) -> Result<InvocationSpec, CatalogError> {
    let name = template.name.as_str();
    let sub = |value: &str| ctx.substitute(name, value);

    let args = template
        .args
        .iter()
        .chain(extras)
        .map(|a| sub(a))
        .collect::<Result<Vec<_>, _>>()?;

    let working_dir = match template.working_dir {
        Some(ref dir) => PathBuf::from(sub(dir)?),
        None => ctx.tool_dir.clone(),
    };

    let output = match template.output {
        Some(ref out) => PathBuf::from(sub(out)?),
        None => ctx.output.clone(),
    };

    let env = template
        .env
        .iter()
        .map(|(k, v)| Ok((k.clone(), sub(v)?)))
        .collect::<Result<BTreeMap<_, _>, CatalogError>>()?;

    Ok(InvocationSpec {
        name: template.name.clone(),
        program: sub(&template.program)?,
        args,
        working_dir,
        env,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fusejob_config::default_strategies;

    fn tool() -> ToolConfig {
        ToolConfig {
            tool_dir: PathBuf::from("/opt/ff"),
            python: "python3".to_string(),
            entry: "facefusion.py".to_string(),
        }
    }

    fn ctx() -> StrategyContext {
        let work = PathBuf::from("/tmp/job");
        StrategyContext::new(
            &tool(),
            &work,
            &work.join("source.jpg"),
            &work.join("target.mp4"),
            &work.join("output/output.mp4"),
        )
    }

    #[test]
    fn test_substitute_all_placeholders() {
        let c = ctx();
        assert_eq!(c.substitute("s", "{python}").unwrap(), "python3");
        assert_eq!(c.substitute("s", "{entry}").unwrap(), "/opt/ff/facefusion.py");
        assert_eq!(c.substitute("s", "--out={output_dir}").unwrap(), "--out=/tmp/job/output");
        assert_eq!(c.substitute("s", "{{literal}}").unwrap(), "{literal}");
    }

    #[test]
    fn test_unknown_placeholder_is_an_error() {
        let err = ctx().substitute("s", "--device={gpu}").unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnresolvedPlaceholder {
                strategy: "s".into(),
                placeholder: "gpu".into()
            }
        );
        assert!(matches!(
            ctx().substitute("s", "{source"),
            Err(CatalogError::Unterminated { .. })
        ));
    }

    #[test]
    fn test_build_preserves_order_and_resolves_fully() {
        let catalog = StrategyCatalog::new(default_strategies());
        let specs = catalog.build(&ctx(), &JobOptions::default()).unwrap();

        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        let expected: Vec<_> = default_strategies().into_iter().map(|s| s.name).collect();
        assert_eq!(names, expected);

        for spec in &specs {
            assert_eq!(spec.program, "python3");
            assert_eq!(spec.working_dir, PathBuf::from("/opt/ff"));
            assert_eq!(spec.output, PathBuf::from("/tmp/job/output/output.mp4"));
            assert!(spec.args.iter().all(|a| !a.contains('{')), "{:?}", spec.args);
        }
    }

    #[test]
    fn test_enhancement_applies_to_every_strategy() {
        let catalog = StrategyCatalog::new(default_strategies())
            .with_enhancement_args(vec!["--processors".into(), "face_enhancer".into()]);

        let plain = catalog.build(&ctx(), &JobOptions::default()).unwrap();
        assert!(plain.iter().all(|s| !s.args.contains(&"face_enhancer".to_string())));

        let enhanced = catalog.build(&ctx(), &JobOptions::enhanced()).unwrap();
        for spec in &enhanced {
            assert_eq!(
                &spec.args[spec.args.len() - 2..],
                &["--processors".to_string(), "face_enhancer".to_string()]
            );
        }
    }

    #[test]
    fn test_template_overrides_and_env() {
        let template = StrategyTemplate::new("custom", "/usr/bin/tool")
            .with_args(["-s", "{source}"])
            .with_working_dir("{work_dir}")
            .with_env("MODEL_HOME", "{tool_dir}/models")
            .with_output("{work_dir}/result.png");
        let specs = StrategyCatalog::new(vec![template])
            .build(&ctx(), &JobOptions::default())
            .unwrap();

        let spec = &specs[0];
        assert_eq!(spec.working_dir, PathBuf::from("/tmp/job"));
        assert_eq!(spec.output, PathBuf::from("/tmp/job/result.png"));
        assert_eq!(spec.env.get("MODEL_HOME").unwrap(), "/opt/ff/models");
        assert_eq!(spec.args, vec!["-s", "/tmp/job/source.jpg"]);
    }

    #[test]
    fn test_empty_catalog() {
        let err = StrategyCatalog::new(vec![])
            .build(&ctx(), &JobOptions::default())
            .unwrap_err();
        assert_eq!(err, CatalogError::Empty);
    }

    #[test]
    fn test_command_line_quotes() {
        let spec = InvocationSpec {
            name: "q".into(),
            program: "python3".into(),
            args: vec!["-c".into(), "print('hi there')".into(), "".into()],
            working_dir: PathBuf::from("/"),
            env: BTreeMap::new(),
            output: PathBuf::from("/out"),
        };
        assert_eq!(spec.command_line(), r#"python3 -c 'print('\''hi there'\'')' ''"#);
    }
}
