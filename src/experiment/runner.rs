//! Experiment driver: defaults, design, job loop and summary.

use super::config::ExperimentConfig;
use super::design::{Design, Job};
use super::format::OutputFormat;
use super::sink::{FileSink, NullSink, ReportSink, Reporter};
use super::stats::{JobStatistics, OutputAccumulator, OutputStats};
use super::types::{Levels, ParamValue, Simulation, SimulationError};
use crate::error::{Error, Result};
use chrono::Local;
use indexmap::IndexMap;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

const RULE: &str = "\n######################################################";

/// Configures one aspect of the simulation and returns the applied value.
pub type Setter<S> =
    Box<dyn FnMut(&mut S, &ParamValue) -> std::result::Result<ParamValue, SimulationError>>;

/// Reads one scalar output from the simulation.
pub type Getter<S> = Box<dyn Fn(&S) -> std::result::Result<f64, SimulationError>>;

enum Setting {
    Default(ParamValue),
    Swept(Vec<ParamValue>),
}

struct Parameter<S> {
    setter: Setter<S>,
    setting: Setting,
}

struct Output<S> {
    getter: Getter<S>,
    format: OutputFormat,
}

/// Where a run currently stands. Transitions are strictly sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    DefaultsApplied,
    DesignBuilt,
    Running { job_id: usize, jobs: usize },
    Summarizing,
    Closed,
}

/// One row of a summary table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub job_id: usize,
    /// Setter return values, one per design column.
    pub parameters: Vec<ParamValue>,
    /// One statistic per output variable.
    pub values: Vec<f64>,
}

/// Per-job means or standard deviations for every completed job.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    pub title: String,
    pub parameter_names: Vec<String>,
    pub output_names: Vec<String>,
    pub rows: Vec<SummaryRow>,
}

/// Outcome of an experiment run.
#[derive(Debug)]
pub struct ExperimentReport {
    /// Phase reached when the run returned. Always [`Phase::Closed`].
    pub phase: Phase,

    pub design: Design,

    /// Statistics of the jobs that completed, in job order.
    pub statistics: Vec<JobStatistics>,

    pub means: SummaryTable,
    pub std_devs: SummaryTable,

    /// The simulation error that halted the job loop, if any.
    pub error: Option<SimulationError>,

    /// Report file, when one was written.
    pub report_path: Option<PathBuf>,

    /// Number of report writes that failed.
    pub sink_failures: usize,
}

impl ExperimentReport {
    /// `true` when every job of the design ran.
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.statistics.len() == self.design.len()
    }
}

/// Runs a caller-supplied simulation over a full-factorial design.
///
/// Parameters are registered with a setter and their values; outputs with
/// a getter and a printf-style format. [`run`](Experiment::run) then
/// applies the defaults, builds the design and, for every job, applies
/// the job's values, runs `job_repetitions` repetitions of the simulation
/// and records the mean and population standard deviation of every
/// output.
///
/// A [`SimulationError`] raised by the simulation, a setter or a getter
/// during the job loop aborts the remaining jobs; statistics of the
/// completed ones are still summarized and returned.
///
/// # Examples
///
/// ```
/// use u_simlab::experiment::{
///     Experiment, ExperimentConfig, Levels, MemorySink, ParamValue, Simulation, SimulationError,
/// };
///
/// #[derive(Default)]
/// struct Growth {
///     rate: f64,
///     value: f64,
///     ticks: usize,
/// }
///
/// impl Simulation for Growth {
///     fn initiate(&mut self) -> Result<(), SimulationError> {
///         self.value = 1.0;
///         self.ticks = 0;
///         Ok(())
///     }
///     fn step(&mut self) -> Result<(), SimulationError> {
///         self.value *= 1.0 + self.rate;
///         self.ticks += 1;
///         Ok(())
///     }
///     fn should_stop(&self) -> Result<bool, SimulationError> {
///         Ok(self.ticks >= 10)
///     }
/// }
///
/// let mut experiment = Experiment::new(ExperimentConfig::new("growth"), Growth::default());
/// experiment.add_parameter(
///     "rate",
///     |sim: &mut Growth, v: &ParamValue| {
///         sim.rate = v.as_f64().unwrap_or(0.0);
///         Ok(v.clone())
///     },
///     Levels::from(vec![0.01, 0.05]),
/// );
/// experiment
///     .add_output("final", |sim: &Growth| Ok(sim.value), "%10.4f")
///     .unwrap();
///
/// let mut sink = MemorySink::new();
/// let report = experiment.run_with_sink(&mut sink).unwrap();
/// assert_eq!(report.statistics.len(), 2);
/// assert!(report.is_complete());
/// ```
pub struct Experiment<S> {
    config: ExperimentConfig,
    simulation: S,
    parameters: IndexMap<String, Parameter<S>>,
    outputs: IndexMap<String, Output<S>>,
    phase: Phase,
}

impl<S: Simulation> Experiment<S> {
    pub fn new(config: ExperimentConfig, simulation: S) -> Self {
        Self {
            config,
            simulation,
            parameters: IndexMap::new(),
            outputs: IndexMap::new(),
            phase: Phase::Uninitialized,
        }
    }

    /// Registers a parameter.
    ///
    /// A fixed value or a single-entry list becomes a default applied once
    /// before the first job. Any other list is swept. Registering a name
    /// again replaces the earlier registration in place.
    pub fn add_parameter<F>(
        &mut self,
        name: impl Into<String>,
        setter: F,
        levels: impl Into<Levels>,
    ) -> &mut Self
    where
        F: FnMut(&mut S, &ParamValue) -> std::result::Result<ParamValue, SimulationError>
            + 'static,
    {
        let setting = match levels.into() {
            Levels::Fixed(value) => Setting::Default(value),
            Levels::List(mut values) if values.len() == 1 => Setting::Default(values.remove(0)),
            Levels::List(values) => Setting::Swept(values),
        };
        self.parameters.insert(
            name.into(),
            Parameter {
                setter: Box::new(setter),
                setting,
            },
        );
        self
    }

    /// Registers an output variable read after every repetition.
    ///
    /// `format` is a printf-style spec such as `"%8.4f"`.
    pub fn add_output<G>(
        &mut self,
        name: impl Into<String>,
        getter: G,
        format: &str,
    ) -> Result<&mut Self>
    where
        G: Fn(&S) -> std::result::Result<f64, SimulationError> + 'static,
    {
        let format = OutputFormat::parse(format)?;
        self.outputs.insert(
            name.into(),
            Output {
                getter: Box::new(getter),
                format,
            },
        );
        Ok(self)
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn simulation(&self) -> &S {
        &self.simulation
    }

    pub fn simulation_mut(&mut self) -> &mut S {
        &mut self.simulation
    }

    pub fn into_simulation(self) -> S {
        self.simulation
    }

    /// Fixed parameters in registration order.
    pub fn defaults(&self) -> Vec<(&str, &ParamValue)> {
        self.parameters
            .iter()
            .filter_map(|(name, p)| match &p.setting {
                Setting::Default(value) => Some((name.as_str(), value)),
                Setting::Swept(_) => None,
            })
            .collect()
    }

    /// Swept parameters in registration order.
    pub fn swept(&self) -> Vec<(&str, &[ParamValue])> {
        self.parameters
            .iter()
            .filter_map(|(name, p)| match &p.setting {
                Setting::Swept(values) => Some((name.as_str(), values.as_slice())),
                Setting::Default(_) => None,
            })
            .collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.keys().map(String::as_str).collect()
    }

    /// Builds the design the next run will execute.
    ///
    /// Without swept parameters the defaults become the design's columns
    /// and a single job runs.
    pub fn build_design(&self) -> Result<Design> {
        let job_id_name = self.config.job_id_name.as_str();
        let swept: IndexMap<String, Levels> = self
            .swept()
            .into_iter()
            .map(|(name, values)| (name.to_string(), Levels::List(values.to_vec())))
            .collect();
        if !swept.is_empty() {
            return Design::full_factorial(&swept, job_id_name);
        }

        let defaults: IndexMap<String, Levels> = self
            .defaults()
            .into_iter()
            .map(|(name, value)| (name.to_string(), Levels::List(vec![value.clone()])))
            .collect();
        if defaults.is_empty() {
            return Ok(Design::single(IndexMap::new(), job_id_name));
        }
        Design::full_factorial(&defaults, job_id_name)
    }

    /// Runs the experiment, reporting to
    /// `{directory}/{name} {timestamp}.csv`.
    ///
    /// If the report file cannot be opened the run goes ahead without it.
    pub fn run(&mut self) -> Result<ExperimentReport> {
        self.config.validate()?;
        let started = timestamp();
        let design = self.prepare()?;

        let path = self.config.report_path(&started);
        match FileSink::open_append(&path) {
            Ok(mut sink) => {
                let mut report = self.execute(design, &started, &mut sink);
                report.report_path = Some(path);
                Ok(report)
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "could not open report file, continuing without it"
                );
                Ok(self.execute(design, &started, &mut NullSink))
            }
        }
    }

    /// Runs the experiment, reporting to `sink`.
    ///
    /// Configuration and design errors, and a failing default setter, are
    /// returned before anything is written.
    pub fn run_with_sink(&mut self, sink: &mut dyn ReportSink) -> Result<ExperimentReport> {
        self.config.validate()?;
        let started = timestamp();
        let design = self.prepare()?;
        Ok(self.execute(design, &started, sink))
    }

    fn prepare(&mut self) -> Result<Design> {
        self.phase = Phase::Uninitialized;
        for (name, parameter) in self.parameters.iter_mut() {
            if let Setting::Default(value) = &parameter.setting {
                (parameter.setter)(&mut self.simulation, value).map_err(|source| {
                    Error::DefaultFailed {
                        name: name.clone(),
                        source,
                    }
                })?;
            }
        }
        self.phase = Phase::DefaultsApplied;

        let design = self.build_design()?;
        self.phase = Phase::DesignBuilt;
        Ok(design)
    }

    fn execute(
        &mut self,
        design: Design,
        started: &str,
        sink: &mut dyn ReportSink,
    ) -> ExperimentReport {
        let mut reporter = Reporter::new(sink);
        info!(
            experiment = %self.config.name,
            jobs = design.len(),
            repetitions = self.config.job_repetitions,
            "experiment started"
        );

        reporter.emit(&format!(
            "Experiment {}\n{}.\nExperiment started {started}\n",
            self.config.name, self.config.comments
        ));
        if self.swept().is_empty() {
            reporter.emit(
                "There are no variants to combine.  A single job will run, with the defaults.",
            );
        }
        self.write_parameter_block(&mut reporter);

        let mut statistics = Vec::with_capacity(design.len());
        let error = match self.run_jobs(&design, &mut statistics, &mut reporter) {
            Ok(()) => None,
            Err(err) => {
                let chain = err.chain().join(": ");
                error!(
                    error = %chain,
                    completed = statistics.len(),
                    jobs = design.len(),
                    "experiment halted"
                );
                reporter.emit(&format!("\nExperiment halted on error: {chain}"));
                Some(err)
            }
        };

        self.phase = Phase::Summarizing;
        let means = self.summarize(&design, &statistics, "JOB AVERAGES", |s| s.mean);
        self.write_summary(&mut reporter, &means);
        let std_devs =
            self.summarize(&design, &statistics, "JOB STANDARD DEVIATIONS", |s| s.std_dev);
        self.write_summary(&mut reporter, &std_devs);

        reporter.emit(RULE);
        reporter.emit(&format!("\nExperiment Completed {}", timestamp()));
        reporter.emit(&format!("{RULE}\n\n"));
        let sink_failures = reporter.finish();
        self.phase = Phase::Closed;

        info!(
            experiment = %self.config.name,
            completed = statistics.len(),
            jobs = design.len(),
            "experiment closed"
        );

        ExperimentReport {
            phase: self.phase,
            design,
            statistics,
            means,
            std_devs,
            error,
            report_path: None,
            sink_failures,
        }
    }

    fn run_jobs(
        &mut self,
        design: &Design,
        statistics: &mut Vec<JobStatistics>,
        reporter: &mut Reporter<'_>,
    ) -> std::result::Result<(), SimulationError> {
        let jobs = design.len();
        let repetitions = self.config.job_repetitions;

        for job in design {
            self.phase = Phase::Running {
                job_id: job.id(),
                jobs,
            };
            info!(job_id = job.id(), jobs, "starting job");

            let applied = self.apply_job(job)?;
            self.write_job_settings(reporter, &applied);

            let mut accumulators: IndexMap<String, OutputAccumulator> = self
                .outputs
                .keys()
                .map(|name| (name.clone(), OutputAccumulator::new()))
                .collect();

            for repetition in 0..repetitions {
                let stamp = timestamp();
                let outputs = self.simulate_once()?;
                debug!(job_id = job.id(), repetition, "repetition complete");

                for (name, value) in &outputs {
                    if !value.is_finite() {
                        warn!(
                            job_id = job.id(),
                            repetition,
                            output = %name,
                            value = *value,
                            "non-finite output"
                        );
                    }
                    if let Some(acc) = accumulators.get_mut(name) {
                        acc.update(*value);
                    }
                }
                reporter.emit(&format!("\n {stamp}, {}", job.id()));
                reporter.emit(&parameter_fields(applied.values()));
                reporter.emit(&self.output_fields(outputs.values().copied()));
            }

            let stats =
                JobStatistics::from_accumulators(job.id(), applied, repetitions, &accumulators);
            reporter.emit("\naverages: ");
            reporter.emit(&parameter_fields(stats.parameters.values()));
            reporter.emit(&self.output_fields(stats.outputs.values().map(|s| s.mean)));
            reporter.emit("\nstandard deviations: ");
            reporter.emit(&parameter_fields(stats.parameters.values()));
            reporter.emit(&self.output_fields(stats.outputs.values().map(|s| s.std_dev)));

            info!(job_id = job.id(), jobs, "job complete");
            statistics.push(stats);
        }
        Ok(())
    }

    /// One repetition: initiate, step until told to stop, read outputs.
    fn simulate_once(&mut self) -> std::result::Result<IndexMap<String, f64>, SimulationError> {
        self.simulation.initiate()?;
        while !self.simulation.should_stop()? {
            self.simulation.step()?;
        }
        self.outputs
            .iter()
            .map(|(name, output)| {
                (output.getter)(&self.simulation).map(|value| (name.clone(), value))
            })
            .collect()
    }

    /// Calls each column's setter with the job's value, in declaration
    /// order, and returns what the setters reported.
    fn apply_job(
        &mut self,
        job: &Job,
    ) -> std::result::Result<IndexMap<String, ParamValue>, SimulationError> {
        let mut applied = IndexMap::with_capacity(job.values().len());
        for (name, value) in job.values() {
            let reported = match self.parameters.get_mut(name) {
                Some(parameter) => (parameter.setter)(&mut self.simulation, value)?,
                None => value.clone(),
            };
            applied.insert(name.clone(), reported);
        }
        Ok(applied)
    }

    fn summarize(
        &mut self,
        design: &Design,
        statistics: &[JobStatistics],
        title: &str,
        pick: impl Fn(&OutputStats) -> f64,
    ) -> SummaryTable {
        let output_names: Vec<String> = self.outputs.keys().cloned().collect();
        let mut rows = Vec::with_capacity(statistics.len());
        for stats in statistics {
            let Some(job) = design.get(stats.job_id) else {
                continue;
            };
            // A setter that fails now falls back to the value it reported
            // when the job ran.
            let parameters = match self.apply_job(job) {
                Ok(applied) => applied.into_values().collect(),
                Err(err) => {
                    warn!(
                        job_id = stats.job_id,
                        error = %err,
                        "setter failed while summarizing"
                    );
                    stats.parameters.values().cloned().collect()
                }
            };
            let values = output_names
                .iter()
                .map(|name| stats.outputs.get(name).map(&pick).unwrap_or(f64::NAN))
                .collect();
            rows.push(SummaryRow {
                job_id: stats.job_id,
                parameters,
                values,
            });
        }
        SummaryTable {
            title: title.to_string(),
            parameter_names: design.parameter_names().to_vec(),
            output_names,
            rows,
        }
    }

    fn output_fields(&self, values: impl Iterator<Item = f64>) -> String {
        self.outputs
            .values()
            .zip(values)
            .map(|(output, value)| format!(",{}", output.format.render(value)))
            .collect()
    }

    fn write_parameter_block(&self, reporter: &mut Reporter<'_>) {
        reporter.emit(RULE);
        reporter.emit("\nExperiment Defaults:");
        for (name, value) in self.defaults() {
            reporter.emit(&format!("\n{name:>40} :,  \t{value}"));
        }
        reporter.emit("\nExperiment Parameter Variations:");
        for (name, values) in self.swept() {
            let listed: Vec<String> = values.iter().map(ToString::to_string).collect();
            reporter.emit(&format!("\n{name:>40} :,  \t[{}]", listed.join(", ")));
        }
        reporter.emit(RULE);
    }

    fn write_job_settings(&self, reporter: &mut Reporter<'_>, applied: &IndexMap<String, ParamValue>) {
        reporter.emit("\n");
        reporter.emit("*********************Job Settings*********************");
        for (name, value) in applied {
            reporter.emit(&format!("\n{name:>40} :\t,{value}"));
        }
        let mut header = format!("\n timestamp, {}", self.config.job_id_name);
        for name in applied.keys().chain(self.outputs.keys()) {
            header.push_str(", ");
            header.push_str(name);
        }
        reporter.emit(&header);
    }

    fn write_summary(&self, reporter: &mut Reporter<'_>, table: &SummaryTable) {
        reporter.emit(RULE);
        reporter.emit(&format!("\nEXPERIMENT SUMMARY:  {}", table.title));
        reporter.emit(&format!("{RULE}\n\n"));

        let header: String = table
            .parameter_names
            .iter()
            .chain(&table.output_names)
            .map(|name| format!(", {name}"))
            .collect();
        reporter.emit(&header);

        for row in &table.rows {
            reporter.emit(&format!("\n {}", row.job_id));
            reporter.emit(&parameter_fields(row.parameters.iter()));
            reporter.emit(&self.output_fields(row.values.iter().copied()));
        }
    }
}

fn parameter_fields<'a>(values: impl Iterator<Item = &'a ParamValue>) -> String {
    values.map(|value| format!(", {value:>20}")).collect()
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}
