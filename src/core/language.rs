use std::path::{Path, PathBuf};

use crate::core::domain::{Language, ResourceSample, RunArtifact};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeasurementStrategy {
    Heuristic,
    HardwareTracked,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Python,
    Node,
    Gnucpp,
    Javac,
    Java,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Program {
    Tool(Tool),
    /// The artifact's own compiled binary.
    Binary,
}

/// Argument placeholders: `{source}`, `{binary}` and `{dir}` expand to the
/// artifact's paths.
#[derive(Clone, Copy, Debug)]
pub struct CommandTemplate {
    pub program: Program,
    pub args: &'static [&'static str],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildPlan {
    pub compile: Option<CommandSpec>,
    pub run: CommandSpec,
}

#[derive(Debug)]
pub struct LanguageStrategy {
    pub language: Language,
    pub source_file: &'static str,
    pub binary_file: Option<&'static str>,
    pub compile: Option<CommandTemplate>,
    pub run: CommandTemplate,
    pub measurement: MeasurementStrategy,
    pub fallback: Option<ResourceSample>,
    pub ram_note: &'static str,
}

static STRATEGIES: [LanguageStrategy; 4] = [
    LanguageStrategy {
        language: Language::Python,
        source_file: "main.py",
        binary_file: None,
        compile: None,
        run: CommandTemplate {
            program: Program::Tool(Tool::Python),
            args: &["{source}"],
        },
        measurement: MeasurementStrategy::HardwareTracked,
        fallback: None,
        ram_note: "estimated",
    },
    LanguageStrategy {
        language: Language::JavaScript,
        source_file: "main.js",
        binary_file: None,
        compile: None,
        run: CommandTemplate {
            program: Program::Tool(Tool::Node),
            args: &["{source}"],
        },
        measurement: MeasurementStrategy::Heuristic,
        fallback: Some(ResourceSample::new(5.0, 50.0)),
        ram_note: "estimated",
    },
    LanguageStrategy {
        language: Language::Cpp,
        source_file: "main.cpp",
        binary_file: Some("main"),
        compile: Some(CommandTemplate {
            program: Program::Tool(Tool::Gnucpp),
            args: &["{source}", "-o", "{binary}", "-std=c++17"],
        }),
        run: CommandTemplate {
            program: Program::Binary,
            args: &[],
        },
        measurement: MeasurementStrategy::Heuristic,
        fallback: Some(ResourceSample::new(8.0, 10.0)),
        ram_note: "estimated",
    },
    LanguageStrategy {
        language: Language::Java,
        // javac requires the file name to match the public class.
        source_file: "Main.java",
        binary_file: Some("Main.class"),
        compile: Some(CommandTemplate {
            program: Program::Tool(Tool::Javac),
            args: &["{source}"],
        }),
        run: CommandTemplate {
            program: Program::Tool(Tool::Java),
            args: &["-cp", "{dir}", "Main"],
        },
        measurement: MeasurementStrategy::Heuristic,
        fallback: Some(ResourceSample::new(10.0, 80.0)),
        ram_note: "estimated (includes JVM overhead)",
    },
];

pub fn strategy_for(language: Language) -> &'static LanguageStrategy {
    match language {
        Language::Python => &STRATEGIES[0],
        Language::JavaScript => &STRATEGIES[1],
        Language::Cpp => &STRATEGIES[2],
        Language::Java => &STRATEGIES[3],
    }
}

impl LanguageStrategy {
    pub fn requires_compile(&self) -> bool {
        self.compile.is_some()
    }

    pub fn build_commands(&self, artifact: &RunArtifact, toolchain: &Toolchain) -> BuildPlan {
        BuildPlan {
            compile: self
                .compile
                .map(|template| template.render(artifact, toolchain)),
            run: self.run.render(artifact, toolchain),
        }
    }
}

impl CommandTemplate {
    fn render(&self, artifact: &RunArtifact, toolchain: &Toolchain) -> CommandSpec {
        let binary = artifact
            .binary_path
            .as_deref()
            .unwrap_or(&artifact.source_path);

        let program = match self.program {
            Program::Tool(tool) => toolchain.path(tool).to_path_buf(),
            Program::Binary => binary.to_path_buf(),
        };
        let args = self
            .args
            .iter()
            .map(|arg| match *arg {
                "{source}" => artifact.source_path.display().to_string(),
                "{binary}" => binary.display().to_string(),
                "{dir}" => artifact.dir.display().to_string(),
                literal => literal.to_string(),
            })
            .collect();

        CommandSpec {
            program,
            args,
            cwd: artifact.dir.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toolchain {
    pub python: PathBuf,
    pub node: PathBuf,
    pub gnucpp: PathBuf,
    pub javac: PathBuf,
    pub java: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            python: "python3".into(),
            node: "node".into(),
            gnucpp: "g++".into(),
            javac: "javac".into(),
            java: "java".into(),
        }
    }
}

impl Toolchain {
    pub fn path(&self, tool: Tool) -> &Path {
        match tool {
            Tool::Python => &self.python,
            Tool::Node => &self.node,
            Tool::Gnucpp => &self.gnucpp,
            Tool::Javac => &self.javac,
            Tool::Java => &self.java,
        }
    }
}
