// Language registry for polyver
//
// Table-driven strategy: one immutable ToolProfile per language, each
// operation a pure argv builder looked up by language id. Profiles are
// defined once at startup; extension collisions are a configuration error
// reported at registry construction, never at call time.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, PolyverError, Result};

/// Supported language identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
    Java,
    Ruby,
    CSharp,
    Php,
    Shell,
    C,
    Cpp,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::Ruby => "ruby",
            Language::CSharp => "csharp",
            Language::Php => "php",
            Language::Shell => "shell",
            Language::C => "c",
            Language::Cpp => "cpp",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Language {
    type Err = PolyverError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "python" | "py" => Ok(Language::Python),
            "javascript" | "js" | "node" => Ok(Language::JavaScript),
            "typescript" | "ts" => Ok(Language::TypeScript),
            "rust" => Ok(Language::Rust),
            "go" | "golang" => Ok(Language::Go),
            "java" => Ok(Language::Java),
            "ruby" => Ok(Language::Ruby),
            "csharp" | "c#" | "dotnet" => Ok(Language::CSharp),
            "php" => Ok(Language::Php),
            "shell" | "bash" | "sh" => Ok(Language::Shell),
            "c" => Ok(Language::C),
            "cpp" | "c++" => Ok(Language::Cpp),
            other => Err(PolyverError::Config(Box::new(ConfigError::InvalidValue {
                field: "language".to_string(),
                message: format!("unknown language '{other}'"),
            }))),
        }
    }
}

/// Operations a tool profile can describe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Run,
    SyntaxCheck,
    Test,
    Format,
    FormatCheck,
    Lint,
    LintFix,
    Build,
    Coverage,
    InstallDeps,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Run => "run",
            Operation::SyntaxCheck => "syntax_check",
            Operation::Test => "test",
            Operation::Format => "format",
            Operation::FormatCheck => "format_check",
            Operation::Lint => "lint",
            Operation::LintFix => "lint_fix",
            Operation::Build => "build",
            Operation::Coverage => "coverage",
            Operation::InstallDeps => "install_deps",
        };
        write!(f, "{name}")
    }
}

/// Pure argv builder: given the target path, produce the command line
pub type CommandTemplate = fn(&Path) -> Vec<String>;

/// Static per-language tool configuration
pub struct ToolProfile {
    pub language: Language,
    /// File extensions (without leading dot) owned by this language
    pub extensions: &'static [&'static str],
    /// Ordered marker filenames signalling this language for a directory.
    /// Entries starting with "*." match any directory entry by extension.
    pub markers: &'static [&'static str],
    commands: HashMap<Operation, CommandTemplate>,
}

impl ToolProfile {
    /// Build the argv for an operation, or None if this language does not
    /// define it
    pub fn command(&self, operation: Operation, target: &Path) -> Option<Vec<String>> {
        self.commands.get(&operation).map(|template| template(target))
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.commands.contains_key(&operation)
    }
}

impl fmt::Debug for ToolProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolProfile")
            .field("language", &self.language)
            .field("extensions", &self.extensions)
            .field("markers", &self.markers)
            .field("operations", &self.commands.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn path_arg(target: &Path) -> String {
    target.display().to_string()
}

/// Registry of tool profiles with validated extension ownership
#[derive(Debug)]
pub struct LanguageRegistry {
    profiles: HashMap<Language, ToolProfile>,
    by_extension: HashMap<String, Language>,
    /// Languages in marker-check priority order
    marker_order: Vec<Language>,
}

impl LanguageRegistry {
    /// Build the registry of built-in profiles, validating that no two
    /// profiles claim the same extension
    pub fn builtin() -> Result<Self> {
        Self::from_profiles(builtin_profiles())
    }

    fn from_profiles(profiles: Vec<ToolProfile>) -> Result<Self> {
        let marker_order: Vec<Language> = profiles.iter().map(|p| p.language).collect();
        let mut by_extension: HashMap<String, Language> = HashMap::new();
        let mut by_language = HashMap::new();

        for profile in profiles {
            for ext in profile.extensions {
                if let Some(existing) = by_extension.get(*ext) {
                    return Err(PolyverError::Config(Box::new(
                        ConfigError::DuplicateExtension {
                            extension: ext.to_string(),
                            first: existing.to_string(),
                            second: profile.language.to_string(),
                        },
                    )));
                }
                by_extension.insert(ext.to_string(), profile.language);
            }
            by_language.insert(profile.language, profile);
        }

        Ok(Self {
            profiles: by_language,
            by_extension,
            marker_order,
        })
    }

    pub fn profile(&self, language: Language) -> Option<&ToolProfile> {
        self.profiles.get(&language)
    }

    pub fn language_for_extension(&self, extension: &str) -> Option<Language> {
        self.by_extension.get(&extension.to_lowercase()).copied()
    }

    /// Languages in the default marker-check priority order
    pub fn marker_order(&self) -> &[Language] {
        &self.marker_order
    }

    pub fn profiles(&self) -> impl Iterator<Item = &ToolProfile> {
        self.profiles.values()
    }
}

struct ProfileBuilder {
    language: Language,
    extensions: &'static [&'static str],
    markers: &'static [&'static str],
    commands: HashMap<Operation, CommandTemplate>,
}

impl ProfileBuilder {
    fn new(
        language: Language,
        extensions: &'static [&'static str],
        markers: &'static [&'static str],
    ) -> Self {
        Self {
            language,
            extensions,
            markers,
            commands: HashMap::new(),
        }
    }

    fn op(mut self, operation: Operation, template: CommandTemplate) -> Self {
        self.commands.insert(operation, template);
        self
    }

    fn build(self) -> ToolProfile {
        ToolProfile {
            language: self.language,
            extensions: self.extensions,
            markers: self.markers,
            commands: self.commands,
        }
    }
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// The built-in profile table. Order here is the default marker-check
/// priority: manifest-bearing ecosystems before ambiguous ones (Makefile
/// last because almost anything can carry one).
fn builtin_profiles() -> Vec<ToolProfile> {
    vec![
        ProfileBuilder::new(Language::Rust, &["rs"], &["Cargo.toml"])
            .op(Operation::Run, |_| argv(&["cargo", "run"]))
            .op(Operation::SyntaxCheck, |_| argv(&["cargo", "check"]))
            .op(Operation::Test, |_| argv(&["cargo", "test"]))
            .op(Operation::Format, |_| argv(&["cargo", "fmt"]))
            .op(Operation::FormatCheck, |_| argv(&["cargo", "fmt", "--check"]))
            .op(Operation::Lint, |_| argv(&["cargo", "clippy"]))
            .op(Operation::LintFix, |_| {
                argv(&["cargo", "clippy", "--fix", "--allow-dirty"])
            })
            .op(Operation::Build, |_| argv(&["cargo", "build"]))
            .op(Operation::Coverage, |_| {
                argv(&["cargo", "tarpaulin", "--skip-clean"])
            })
            .op(Operation::InstallDeps, |_| argv(&["cargo", "fetch"]))
            .build(),
        ProfileBuilder::new(Language::Go, &["go"], &["go.mod", "go.sum"])
            .op(Operation::Run, |_| argv(&["go", "run", "."]))
            .op(Operation::SyntaxCheck, |_| argv(&["go", "vet", "./..."]))
            .op(Operation::Test, |_| argv(&["go", "test", "-v", "./..."]))
            .op(Operation::Format, |_| argv(&["gofmt", "-w", "."]))
            .op(Operation::FormatCheck, |_| argv(&["gofmt", "-l", "."]))
            .op(Operation::Lint, |_| argv(&["go", "vet", "./..."]))
            .op(Operation::Build, |_| argv(&["go", "build", "./..."]))
            .op(Operation::Coverage, |_| {
                argv(&["go", "test", "-cover", "./..."])
            })
            .op(Operation::InstallDeps, |_| argv(&["go", "mod", "download"]))
            .build(),
        // tsconfig.json outranks package.json so TypeScript projects are not
        // mistaken for plain JavaScript
        ProfileBuilder::new(Language::TypeScript, &["ts", "tsx"], &["tsconfig.json"])
            .op(Operation::Run, |t| {
                vec!["npx".into(), "ts-node".into(), path_arg(t)]
            })
            .op(Operation::SyntaxCheck, |_| {
                argv(&["npx", "tsc", "--noEmit"])
            })
            .op(Operation::Test, |_| argv(&["npm", "test"]))
            .op(Operation::Format, |_| {
                argv(&["npx", "prettier", "--write", "."])
            })
            .op(Operation::FormatCheck, |_| {
                argv(&["npx", "prettier", "--check", "."])
            })
            .op(Operation::Lint, |_| argv(&["npx", "eslint", "."]))
            .op(Operation::LintFix, |_| {
                argv(&["npx", "eslint", ".", "--fix"])
            })
            .op(Operation::Build, |_| argv(&["npx", "tsc"]))
            .op(Operation::Coverage, |_| {
                argv(&["npx", "jest", "--coverage"])
            })
            .op(Operation::InstallDeps, |_| argv(&["npm", "install"]))
            .build(),
        ProfileBuilder::new(
            Language::JavaScript,
            &["js", "mjs", "cjs", "jsx"],
            &["package.json", "package-lock.json"],
        )
        .op(Operation::Run, |t| vec!["node".into(), path_arg(t)])
        .op(Operation::SyntaxCheck, |t| {
            vec!["node".into(), "--check".into(), path_arg(t)]
        })
        .op(Operation::Test, |_| argv(&["npm", "test"]))
        .op(Operation::Format, |_| {
            argv(&["npx", "prettier", "--write", "."])
        })
        .op(Operation::FormatCheck, |_| {
            argv(&["npx", "prettier", "--check", "."])
        })
        .op(Operation::Lint, |_| argv(&["npx", "eslint", "."]))
        .op(Operation::LintFix, |_| argv(&["npx", "eslint", ".", "--fix"]))
        .op(Operation::Build, |_| argv(&["npm", "run", "build"]))
        .op(Operation::Coverage, |_| argv(&["npx", "jest", "--coverage"]))
        .op(Operation::InstallDeps, |_| argv(&["npm", "install"]))
        .build(),
        ProfileBuilder::new(
            Language::Python,
            &["py"],
            &["pyproject.toml", "requirements.txt", "setup.py", "Pipfile"],
        )
        .op(Operation::Run, |t| vec!["python3".into(), path_arg(t)])
        .op(Operation::SyntaxCheck, |t| {
            vec![
                "python3".into(),
                "-m".into(),
                "py_compile".into(),
                path_arg(t),
            ]
        })
        .op(Operation::Test, |_| {
            argv(&["python3", "-m", "pytest", "-v"])
        })
        .op(Operation::Format, |_| argv(&["python3", "-m", "black", "."]))
        .op(Operation::FormatCheck, |_| {
            argv(&["python3", "-m", "black", "--check", "."])
        })
        .op(Operation::Lint, |_| {
            argv(&["python3", "-m", "flake8", ".", "--max-line-length=120"])
        })
        .op(Operation::Coverage, |_| {
            argv(&[
                "python3",
                "-m",
                "pytest",
                "--cov=.",
                "--cov-report=term",
            ])
        })
        .op(Operation::InstallDeps, |_| {
            argv(&["python3", "-m", "pip", "install", "-r", "requirements.txt"])
        })
        .build(),
        ProfileBuilder::new(
            Language::Java,
            &["java"],
            &["pom.xml", "build.gradle", "build.gradle.kts"],
        )
        .op(Operation::SyntaxCheck, |t| {
            vec!["javac".into(), path_arg(t)]
        })
        .op(Operation::Test, |_| argv(&["mvn", "-q", "test"]))
        .op(Operation::Build, |_| argv(&["mvn", "-q", "package"]))
        .op(Operation::InstallDeps, |_| {
            argv(&["mvn", "-q", "dependency:resolve"])
        })
        .build(),
        ProfileBuilder::new(Language::Ruby, &["rb"], &["Gemfile"])
            .op(Operation::Run, |t| vec!["ruby".into(), path_arg(t)])
            .op(Operation::SyntaxCheck, |t| {
                vec!["ruby".into(), "-c".into(), path_arg(t)]
            })
            .op(Operation::Test, |_| argv(&["bundle", "exec", "rspec"]))
            .op(Operation::Format, |_| argv(&["rubocop", "-a", "."]))
            .op(Operation::FormatCheck, |_| argv(&["rubocop", "."]))
            .op(Operation::Lint, |_| argv(&["rubocop", "."]))
            .op(Operation::LintFix, |_| argv(&["rubocop", "-a", "."]))
            .op(Operation::InstallDeps, |_| argv(&["bundle", "install"]))
            .build(),
        ProfileBuilder::new(Language::CSharp, &["cs"], &["*.csproj", "*.sln"])
            .op(Operation::Run, |_| argv(&["dotnet", "run"]))
            .op(Operation::Test, |_| argv(&["dotnet", "test"]))
            .op(Operation::Format, |_| argv(&["dotnet", "format"]))
            .op(Operation::FormatCheck, |_| {
                argv(&["dotnet", "format", "--verify-no-changes"])
            })
            .op(Operation::Build, |_| argv(&["dotnet", "build"]))
            .op(Operation::InstallDeps, |_| argv(&["dotnet", "restore"]))
            .build(),
        ProfileBuilder::new(Language::Php, &["php"], &["composer.json"])
            .op(Operation::Run, |t| vec!["php".into(), path_arg(t)])
            .op(Operation::SyntaxCheck, |t| {
                vec!["php".into(), "-l".into(), path_arg(t)]
            })
            .op(Operation::Test, |_| argv(&["vendor/bin/phpunit"]))
            .op(Operation::InstallDeps, |_| argv(&["composer", "install"]))
            .build(),
        ProfileBuilder::new(Language::Cpp, &["cpp", "cc", "cxx", "hpp"], &["CMakeLists.txt"])
            .op(Operation::SyntaxCheck, |t| {
                vec!["g++".into(), "-fsyntax-only".into(), path_arg(t)]
            })
            .op(Operation::Build, |_| {
                argv(&["cmake", "--build", "build"])
            })
            .op(Operation::Test, |_| {
                argv(&["ctest", "--test-dir", "build"])
            })
            .build(),
        ProfileBuilder::new(Language::C, &["c", "h"], &["Makefile"])
            .op(Operation::SyntaxCheck, |t| {
                vec!["gcc".into(), "-fsyntax-only".into(), path_arg(t)]
            })
            .op(Operation::Build, |_| argv(&["make"]))
            .build(),
        // Shell has no manifest; detection is extension-only
        ProfileBuilder::new(Language::Shell, &["sh", "bash"], &[])
            .op(Operation::Run, |t| vec!["bash".into(), path_arg(t)])
            .op(Operation::SyntaxCheck, |t| {
                vec!["bash".into(), "-n".into(), path_arg(t)]
            })
            .op(Operation::Lint, |t| vec!["shellcheck".into(), path_arg(t)])
            .build(),
    ]
}
