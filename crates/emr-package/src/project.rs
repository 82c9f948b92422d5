//! Project package variants and the deploy step.

use derive_more::Display;
use emr_core::package::DeploymentPackage;
use emr_core::storage::{ObjectStore, join_uri};
use emr_core::{BackendKind, Error, ParameterSet, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const PYFILES_ARCHIVE: &str = "pyfiles.zip";
const DEPS_ARCHIVE: &str = "pyspark_deps.tar.gz";
const VENV_PYTHON: &str = "./environment/bin/python";

/// Directories never packed into the python files archive.
const SKIPPED_DIRS: &[&str] = &[".venv"];

/// How a project ships its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProjectKind {
    /// A single PySpark file or jar.
    #[display("simple")]
    Simple,
    /// Several `.py` files; everything but the entry point is zipped.
    #[display("python-files")]
    PythonFiles,
    /// A poetry project whose dependencies are packed into a virtualenv archive.
    #[display("poetry")]
    Poetry,
}

impl ProjectKind {
    /// Build output uploaded next to the entry point, if any.
    pub fn artifact(&self) -> Option<&'static str> {
        match self {
            ProjectKind::Simple => None,
            ProjectKind::PythonFiles => Some(PYFILES_ARCHIVE),
            ProjectKind::Poetry => Some(DEPS_ARCHIVE),
        }
    }
}

impl std::str::FromStr for ProjectKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple" => Ok(ProjectKind::Simple),
            "python-files" => Ok(ProjectKind::PythonFiles),
            "poetry" => Ok(ProjectKind::Poetry),
            other => Err(Error::Configuration(format!(
                "unknown project type: {}",
                other
            ))),
        }
    }
}

/// A local project that can be uploaded and then run on any backend.
#[derive(Debug, Clone)]
pub struct ProjectPackage {
    kind: ProjectKind,
    entry_point: PathBuf,
    project_dir: PathBuf,
    dist_dir: PathBuf,
    code_uri: Option<String>,
}

impl ProjectPackage {
    pub fn new(kind: ProjectKind, entry_point: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            entry_point: entry_point.into(),
            project_dir: PathBuf::from("."),
            dist_dir: PathBuf::from("dist"),
            code_uri: None,
        }
    }

    /// Use an already-uploaded code location.
    pub fn with_code_uri(mut self, code_uri: impl Into<String>) -> Self {
        self.code_uri = Some(code_uri.into());
        self
    }

    /// Root searched for modules when building a python files archive.
    pub fn with_project_dir(mut self, project_dir: impl Into<PathBuf>) -> Self {
        self.project_dir = project_dir.into();
        self
    }

    pub fn with_dist_dir(mut self, dist_dir: impl Into<PathBuf>) -> Self {
        self.dist_dir = dist_dir.into();
        self
    }

    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    pub fn code_uri(&self) -> Option<&str> {
        self.code_uri.as_deref()
    }

    fn entry_point_file_name(&self) -> Result<String> {
        self.entry_point
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "entry point has no file name: {}",
                    self.entry_point.display()
                ))
            })
    }

    fn artifact_uri(&self, artifact: &str) -> Result<String> {
        let base = self
            .code_uri
            .as_deref()
            .ok_or_else(|| Error::NotDeployed(artifact.to_string()))?;
        Ok(join_uri(base, &[artifact]))
    }

    /// Local files to upload paired with their file name under the code URI.
    pub fn upload_plan(&self) -> Result<Vec<(PathBuf, String)>> {
        let mut plan = vec![(self.entry_point.clone(), self.entry_point_file_name()?)];
        if let Some(artifact) = self.kind.artifact() {
            plan.push((self.dist_dir.join(artifact), artifact.to_string()));
        }
        Ok(plan)
    }

    /// Produce the build artifact in the dist directory.
    ///
    /// Python files projects zip every `.py` file under the project
    /// directory except the entry point. Poetry archives are built outside
    /// this tool, so only their presence is checked at deploy time.
    pub fn build(&self) -> Result<Option<PathBuf>> {
        match self.kind {
            ProjectKind::Simple => Ok(None),
            ProjectKind::Poetry => {
                debug!(
                    dist_dir = %self.dist_dir.display(),
                    "Poetry dependency archive is built externally"
                );
                Ok(None)
            }
            ProjectKind::PythonFiles => self.build_pyfiles().map(Some),
        }
    }

    fn build_pyfiles(&self) -> Result<PathBuf> {
        let entry_point = std::fs::canonicalize(&self.entry_point)?;
        let mut files = Vec::new();
        find_py_files(&self.project_dir, &mut files)?;
        files.sort();

        std::fs::create_dir_all(&self.dist_dir)?;
        let target = self.dist_dir.join(PYFILES_ARCHIVE);
        let mut writer = ZipWriter::new(File::create(&target)?);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut count = 0;
        for file in &files {
            if std::fs::canonicalize(file)? == entry_point {
                continue;
            }
            let name = archive_name(&self.project_dir, file)?;
            writer.start_file(name.as_str(), options).map_err(zip_error)?;
            writer.write_all(&std::fs::read(file)?)?;
            count += 1;
        }
        writer.finish().map_err(zip_error)?;

        info!(archive = %target.display(), files = count, "Built python files archive");
        Ok(target)
    }

    /// Build the project, then upload it to `code_uri` and record the location.
    ///
    /// Returns the remote entry point URI.
    pub async fn deploy(&mut self, store: &dyn ObjectStore, code_uri: &str) -> Result<String> {
        self.build()?;
        self.upload(store, code_uri).await?;
        self.code_uri = Some(code_uri.to_string());
        self.entrypoint_uri()
    }

    /// Upload the entry point and build artifacts to `code_uri`.
    ///
    /// Every local file is checked before the first upload.
    pub async fn upload(&self, store: &dyn ObjectStore, code_uri: &str) -> Result<()> {
        let plan = self.upload_plan()?;
        for (local, _) in &plan {
            if !local.is_file() {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("{} does not exist, build the project first", local.display()),
                )));
            }
        }

        info!(
            kind = %self.kind,
            entry_point = %self.entry_point.display(),
            code_uri,
            "Deploying project"
        );
        for (local, name) in &plan {
            let target = join_uri(code_uri, &[name]);
            store.put_file(local, &target).await?;
            info!(file = %local.display(), target = %target, "Uploaded");
        }
        Ok(())
    }
}

fn find_py_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            let skipped = path
                .file_name()
                .is_some_and(|name| SKIPPED_DIRS.iter().any(|s| name == *s));
            if !skipped {
                find_py_files(&path, files)?;
            }
        } else if path.extension().is_some_and(|ext| ext == "py") {
            files.push(path);
        }
    }
    Ok(())
}

/// Archive entry name: the path relative to the project, `/`-separated.
fn archive_name(project_dir: &Path, file: &Path) -> Result<String> {
    let relative = file.strip_prefix(project_dir).map_err(|_| {
        Error::Configuration(format!(
            "{} is outside the project directory",
            file.display()
        ))
    })?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Io(std::io::Error::other(e))
}

impl DeploymentPackage for ProjectPackage {
    fn entrypoint_uri(&self) -> Result<String> {
        let name = self.entry_point_file_name()?;
        self.artifact_uri(&name)
    }

    fn parameters(&self) -> ParameterSet {
        // Parameters reference the code location, so there are none until it is known.
        let Some(base) = self.code_uri.as_deref() else {
            return ParameterSet::new();
        };

        match self.kind {
            ProjectKind::Simple => ParameterSet::new(),
            ProjectKind::PythonFiles => ParameterSet::new()
                .with_common("spark.submit.pyFiles", join_uri(base, &[PYFILES_ARCHIVE])),
            ProjectKind::Poetry => ParameterSet::new()
                .with_common(
                    "spark.archives",
                    format!("{}#environment", join_uri(base, &[DEPS_ARCHIVE])),
                )
                .with_override(
                    BackendKind::Serverless,
                    "spark.emr-serverless.driverEnv.PYSPARK_DRIVER_PYTHON",
                    VENV_PYTHON,
                )
                .with_override(
                    BackendKind::Serverless,
                    "spark.emr-serverless.driverEnv.PYSPARK_PYTHON",
                    VENV_PYTHON,
                )
                .with_override(
                    BackendKind::Serverless,
                    "spark.executorEnv.PYSPARK_PYTHON",
                    VENV_PYTHON,
                )
                .with_override(
                    BackendKind::Cluster,
                    "spark.executorEnv.PYSPARK_PYTHON",
                    VENV_PYTHON,
                )
                .with_override(
                    BackendKind::Cluster,
                    "spark.yarn.appMasterEnv.PYSPARK_PYTHON",
                    VENV_PYTHON,
                )
                .with_override(BackendKind::Containers, "spark.pyspark.python", VENV_PYTHON),
        }
    }
}

/// Resolve `path` against the project directory unless it is already absolute.
pub fn resolve_in(project_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}
