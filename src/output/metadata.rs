//! Writes `metadata.toml`, which records how and on what a model run was carried out
use crate::results::Solution;
use anyhow::{Result, anyhow};
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get information about program version from git
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    solution: SolutionMetadata,
    program: ProgramMetadata<'a>,
    platform: PlatformMetadata,
}

/// Information about the model run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// Path to the model which was run
    model_path: &'a Path,
    /// The date and time at which the metadata was written
    datetime: String,
}

impl<'a> RunMetadata<'a> {
    fn new(model_path: &'a Path) -> Self {
        Self {
            model_path,
            datetime: Local::now().to_rfc2822(),
        }
    }
}

/// Size of the problem and how the solve went
#[derive(Serialize)]
struct SolutionMetadata {
    status: String,
    objective: f64,
    num_variables: usize,
    num_constraints: usize,
}

impl SolutionMetadata {
    fn new(solution: &Solution) -> Self {
        let (num_variables, num_constraints) = solution.problem_size();
        Self {
            status: solution.status().to_string(),
            objective: solution.objective(),
            num_variables,
            num_constraints,
        }
    }
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    name: &'a str,
    /// As specified in Cargo.toml
    version: &'a str,
    /// The target architecture for the build (e.g. x86_64-unknown-linux-gnu)
    target: &'a str,
    is_debug: bool,
    rustc_version: &'a str,
    build_time_utc: &'a str,
    /// Short commit hash, if known
    git_commit_hash: String,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// The machine the model was run on, as reported by [`PlatformInfo`]
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl PlatformMetadata {
    fn new() -> Result<Self> {
        let info = PlatformInfo::new()
            .map_err(|err| anyhow!("Unable to determine platform info: {err}"))?;
        Ok(Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        })
    }
}

/// Write metadata for a finished run to the specified output path in TOML format
pub fn write_metadata(output_path: &Path, model_path: &Path, solution: &Solution) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(model_path),
        solution: SolutionMetadata::new(solution),
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::new()?,
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::registry;
    use crate::optimisation::{SolveStatus, SolverOutcome, build_problem};
    use crate::registry::EntityRegistry;
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    fn test_write_metadata(registry: EntityRegistry) {
        let pathway = build_problem(&registry);
        let outcome = SolverOutcome {
            status: SolveStatus::TimeLimitReached,
            columns: vec![0.0; pathway.problem.num_variables()],
            objective: 42.0,
        };
        let solution = Solution::new(&registry, pathway, outcome);

        let dir = tempdir().unwrap();
        write_metadata(dir.path(), Path::new("some_model"), &solution).unwrap();

        let contents = fs::read_to_string(dir.path().join(METADATA_FILE_NAME)).unwrap();
        let table: toml::Table = toml::from_str(&contents).unwrap();
        assert_eq!(
            table["solution"]["status"].as_str(),
            Some("time_limit_reached")
        );
        assert_eq!(table["solution"]["objective"].as_float(), Some(42.0));
        assert_eq!(table["run"]["model_path"].as_str(), Some("some_model"));
        assert_eq!(table["program"]["name"].as_str(), Some("freightpath"));
    }
}
