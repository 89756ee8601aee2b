//! SLURM batch submission.
//!
//! Turns a handful of options into an `sbatch` script, writes it to
//! [`SCRIPT_FILE`] and pipes it to `sbatch` unless running dry.

use crate::error::Result;
use crate::logging::{LogTarget, init_tracing};
use crate::runner::{Invocation, ProcessRunner};
use clap::Parser;
use std::fmt::Write as _;

pub const SCRIPT_FILE: &str = "SLURM_INPUT.sh";
pub const MPI_PMI_LIBRARY: &str = "/cm/shared/apps/slurm/current/lib/libpmi.so";

#[derive(Parser, Debug, Clone)]
#[command(name = "jobsubmit")]
#[command(version)]
#[command(about = "Submit a job to the SLURM workload manager")]
pub struct SubmitArgs {
  /// Maximum job runtime (in minutes)
  #[arg(short, long, default_value_t = 30)]
  pub walltime: u32,

  /// SLURM job name
  #[arg(short = 'N', long, default_value = "SLURM_job")]
  pub name: String,

  /// Number of nodes to allocate
  #[arg(short, long, default_value_t = 1)]
  pub nnodes: u32,

  /// Number of tasks per node
  #[arg(short = 't', long, default_value_t = 16)]
  pub ntasks: u32,

  /// Executable for job submission
  #[arg(short, long, default_value = "solve_xml_mumps")]
  pub executable: String,

  /// Submit single-core job
  #[arg(long)]
  pub no_mpi: bool,

  /// Set I_MPI_PMI_LIBRARY environment variable
  #[arg(long)]
  pub set_mpi_library: bool,

  /// Submit job array to queue, one task per directory
  #[arg(short = 'a', long, num_args = 1.., value_name = "DIR")]
  pub jobarray: Vec<String>,

  /// Write submit file and exit
  #[arg(short, long)]
  pub dryrun: bool,

  /// Write output and error to TMP file instead of slurm-SLURM-ID.out
  #[arg(short = 'p', long)]
  pub tmp: Option<String>,

  /// Suppress output to stdout
  #[arg(short, long)]
  pub silent: bool,

  /// Specify the partition
  #[arg(short = 'P', long, default_value = "mem_0064")]
  pub partition: String,

  /// Specify quality of service (QOS)
  #[arg(short = 'Q', long, default_value = "normal_0064")]
  pub qos: String,

  /// Specify user account
  #[arg(short = 'A', long, default_value = "p70072")]
  pub account: String,

  /// Override the partition/qos/account settings and use the institute nodes
  #[arg(long = "itp", visible_alias = "ITP")]
  pub itp: bool,

  /// Use the development QOS (for runtimes < 10')
  #[arg(long)]
  pub dev: bool,
}

/// Everything the batch script is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
  pub name: String,
  pub walltime_minutes: u32,
  pub nnodes: u32,
  pub ntasks: u32,
  pub executable: String,
  pub mpi: bool,
  pub set_mpi_library: bool,
  pub job_dirs: Vec<String>,
  pub tmp: Option<String>,
  pub partition: String,
  pub qos: String,
  pub account: String,
}

impl SubmitArgs {
  /// Applies `--itp` and then `--dev` on top of the plain options.
  pub fn job_spec(&self) -> JobSpec {
    let mut spec = JobSpec {
      name: self.name.clone(),
      walltime_minutes: self.walltime,
      nnodes: self.nnodes,
      ntasks: self.ntasks,
      executable: self.executable.clone(),
      mpi: !self.no_mpi,
      set_mpi_library: self.set_mpi_library,
      job_dirs: self.jobarray.clone(),
      tmp: self.tmp.clone(),
      partition: self.partition.clone(),
      qos: self.qos.clone(),
      account: self.account.clone(),
    };

    if self.itp {
      spec.qos = "p70623_0256".to_string();
      spec.partition = "mem_0256".to_string();
      spec.account = "p70623".to_string();
    }
    if self.dev {
      spec.qos = "devel_0128".to_string();
    }

    spec
  }
}

impl JobSpec {
  /// `HH:MM:00` for `--time`.
  pub fn walltime(&self) -> String {
    format!(
      "{:02}:{:02}:00",
      self.walltime_minutes / 60,
      self.walltime_minutes % 60
    )
  }

  pub fn is_array(&self) -> bool {
    !self.job_dirs.is_empty()
  }

  /// Human readable option summary.
  pub fn describe(&self) -> String {
    let dirs = if self.is_array() {
      self.job_dirs.join(" ")
    } else {
      "None".to_string()
    };

    let mut out = String::from("Options:\n\n");
    let rows = [
      ("Job name", self.name.clone()),
      ("Maximum job runtime", format!("{} minutes", self.walltime_minutes)),
      ("Number of nodes", self.nnodes.to_string()),
      ("Executable file", self.executable.clone()),
      ("Job array directories", dirs),
      ("Output files", self.tmp.clone().unwrap_or_else(|| "None".to_string())),
      ("Partition", self.partition.clone()),
      ("Quality of Service", self.qos.clone()),
      ("Account", self.account.clone()),
    ];
    for (label, value) in rows {
      let _ = writeln!(out, "    {:<24}{}", format!("{label}:"), value);
    }
    out
  }

  /// The batch script. All `#SBATCH` directives precede the first command,
  /// since `sbatch` stops reading them there.
  pub fn script(&self) -> String {
    let mut script = String::from("#!/bin/bash\n\n");

    let _ = writeln!(script, "#SBATCH --job-name={}", self.name);
    let _ = writeln!(script, "#SBATCH --time={}", self.walltime());
    let _ = writeln!(script, "#SBATCH --nodes {}", self.nnodes);
    let _ = writeln!(script, "#SBATCH --ntasks-per-node={}", self.ntasks);
    let _ = writeln!(script, "#SBATCH --partition={}", self.partition);
    let _ = writeln!(script, "#SBATCH --qos={}", self.qos);
    let _ = writeln!(script, "#SBATCH --account={}", self.account);

    if self.is_array() {
      let _ = writeln!(script, "#SBATCH --array 1-{}", self.job_dirs.len());
    }
    if let Some(tmp) = &self.tmp {
      let _ = writeln!(script, "#SBATCH --output={}", tmp);
      let _ = writeln!(script, "#SBATCH --error={}", tmp);
    }

    if self.is_array() {
      script.push('\n');
      let _ = writeln!(script, "JOB_DIRS=({})", self.job_dirs.join(" "));
      script.push_str("INDEX=$((${SLURM_ARRAY_TASK_ID} - 1))\n");
      script.push_str("cd ${JOB_DIRS[${INDEX}]}\n");
    }

    script.push('\n');
    let link_output = self.is_array() && self.tmp.is_none();
    if link_output {
      script.push_str(
        "OUTPUT=$SLURM_SUBMIT_DIR/slurm-${SLURM_ARRAY_JOB_ID}_${SLURM_ARRAY_TASK_ID}.out\n",
      );
      script.push_str("ln -s $OUTPUT .\n");
    }

    script.push_str("unset I_MPI_PIN_PROCESSOR_LIST\n");
    if self.set_mpi_library {
      let _ = writeln!(script, "export I_MPI_PMI_LIBRARY={}", MPI_PMI_LIBRARY);
    }
    if self.mpi {
      let _ = writeln!(script, "time mpirun -np $SLURM_NTASKS {}", self.executable);
    } else {
      let _ = writeln!(script, "time {}", self.executable);
    }

    if link_output {
      script.push_str("unlink $(basename $OUTPUT)\n");
      script.push_str("gzip $OUTPUT\n");
      script.push_str("mv $OUTPUT.gz .\n");
    }

    script
  }
}

/// Entry point of the `jobsubmit` binary.
pub async fn run() -> anyhow::Result<()> {
  let args = SubmitArgs::parse();
  init_tracing(LogTarget::Stderr)?;

  let spec = args.job_spec();
  let script = spec.script();

  if !args.silent {
    println!("{}", spec.describe());
  }

  std::fs::write(SCRIPT_FILE, &script)?;
  tracing::info!(path = SCRIPT_FILE, "batch script written");

  if !args.silent {
    println!("SLURM settings:\n{}", script);
  }

  if args.dryrun {
    return Ok(());
  }

  let output = submit(&ProcessRunner::new(), &script).await?;
  print!("{}", output);

  Ok(())
}

/// Pipes `script` to `sbatch` and returns what it printed.
pub async fn submit(runner: &ProcessRunner, script: &str) -> Result<String> {
  let sbatch = Invocation::new("sbatch", Vec::new());
  runner.run_with_input(&sbatch, script).await
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(extra: &[&str]) -> SubmitArgs {
    let mut argv = vec!["jobsubmit"];
    argv.extend_from_slice(extra);
    SubmitArgs::try_parse_from(argv).unwrap()
  }

  #[test]
  fn defaults() {
    let spec = args(&[]).job_spec();

    assert_eq!(spec.name, "SLURM_job");
    assert_eq!(spec.walltime(), "00:30:00");
    assert_eq!(spec.nnodes, 1);
    assert_eq!(spec.ntasks, 16);
    assert!(spec.mpi);
    assert_eq!(spec.partition, "mem_0064");
    assert_eq!(spec.qos, "normal_0064");
    assert_eq!(spec.account, "p70072");
  }

  #[test]
  fn walltime_rolls_over_hours() {
    let spec = args(&["-w", "90"]).job_spec();
    assert_eq!(spec.walltime(), "01:30:00");
  }

  #[test]
  fn itp_then_dev_overrides() {
    let spec = args(&["--itp", "--dev"]).job_spec();

    assert_eq!(spec.partition, "mem_0256");
    assert_eq!(spec.account, "p70623");
    assert_eq!(spec.qos, "devel_0128");
  }

  #[test]
  fn upper_case_itp_alias() {
    assert!(args(&["--ITP"]).itp);
  }

  #[test]
  fn plain_script() {
    let script = args(&["-N", "solve", "--no-mpi"]).job_spec().script();

    assert_eq!(
      script,
      "#!/bin/bash\n\
       \n\
       #SBATCH --job-name=solve\n\
       #SBATCH --time=00:30:00\n\
       #SBATCH --nodes 1\n\
       #SBATCH --ntasks-per-node=16\n\
       #SBATCH --partition=mem_0064\n\
       #SBATCH --qos=normal_0064\n\
       #SBATCH --account=p70072\n\
       \n\
       unset I_MPI_PIN_PROCESSOR_LIST\n\
       time solve_xml_mumps\n"
    );
  }

  #[test]
  fn array_script_links_output() {
    let script = args(&["-a", "run1", "run2", "run3"]).job_spec().script();

    assert!(script.contains("#SBATCH --array 1-3\n"));
    assert!(script.contains("JOB_DIRS=(run1 run2 run3)\n"));
    assert!(script.contains("cd ${JOB_DIRS[${INDEX}]}\n"));
    assert!(script.contains("ln -s $OUTPUT .\n"));
    assert!(script.contains("time mpirun -np $SLURM_NTASKS solve_xml_mumps\n"));
    assert!(script.ends_with("mv $OUTPUT.gz .\n"));
  }

  #[test]
  fn tmp_file_directives_precede_commands() {
    let script = args(&["-a", "run1", "-p", "out.log", "--set-mpi-library"])
      .job_spec()
      .script();

    let output = script.find("#SBATCH --output=out.log").unwrap();
    let first_command = script.find("JOB_DIRS=").unwrap();

    assert!(output < first_command);
    assert!(script.contains("#SBATCH --error=out.log\n"));
    assert!(!script.contains("ln -s"));
    assert!(script.contains(&format!("export I_MPI_PMI_LIBRARY={MPI_PMI_LIBRARY}\n")));
  }

  #[test]
  fn describe_lists_options() {
    let text = args(&["-a", "a", "b"]).job_spec().describe();

    assert!(text.contains("Job name:               SLURM_job"));
    assert!(text.contains("Job array directories:  a b"));
    assert!(text.contains("Output files:           None"));
  }
}
