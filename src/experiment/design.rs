//! Full-factorial design generation.

use super::types::{Levels, ParamValue};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use tracing::debug;

/// One concrete assignment of values to the design's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    id: usize,
    values: IndexMap<String, ParamValue>,
}

impl Job {
    /// 1-based job identifier, ascending in emission order.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Parameter values in declaration order.
    pub fn values(&self) -> &IndexMap<String, ParamValue> {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// The job as a flat record, with its id appended under `job_id_name`.
    pub fn to_record(&self, job_id_name: &str) -> IndexMap<String, ParamValue> {
        let mut record = self.values.clone();
        record.insert(job_id_name.to_string(), ParamValue::Int(self.id as i64));
        record
    }
}

/// Enumerates the Cartesian product of `parameters`.
///
/// Jobs are emitted in odometer order: the last declared parameter cycles
/// fastest, the first slowest. Ids start at 1.
///
/// Fails when a parameter carries a [`Levels::Fixed`] value, has an empty
/// list, is named `job_id_name`, or when there are no parameters at all.
///
/// ```
/// use indexmap::IndexMap;
/// use u_simlab::experiment::{full_factorial_design, Levels, ParamValue};
///
/// let mut parameters = IndexMap::new();
/// parameters.insert("A".to_string(), Levels::from(vec![1, 2]));
/// parameters.insert("B".to_string(), Levels::from(vec![10, 20, 30]));
///
/// let jobs = full_factorial_design(&parameters, "job_id").unwrap();
/// assert_eq!(jobs.len(), 6);
/// assert_eq!(jobs[1].get("A"), Some(&ParamValue::Int(1)));
/// assert_eq!(jobs[1].get("B"), Some(&ParamValue::Int(20)));
/// ```
pub fn full_factorial_design(
    parameters: &IndexMap<String, Levels>,
    job_id_name: &str,
) -> Result<Vec<Job>> {
    let mut dimensions: Vec<(&str, &[ParamValue])> = Vec::with_capacity(parameters.len());
    for (name, levels) in parameters {
        let values = match levels {
            Levels::List(values) => values.as_slice(),
            Levels::Fixed(_) => return Err(Error::NotAList { name: name.clone() }),
        };
        if name == job_id_name {
            return Err(Error::JobIdCollision {
                name: name.clone(),
                job_id_name: job_id_name.to_string(),
            });
        }
        if values.is_empty() {
            return Err(Error::EmptyLevels { name: name.clone() });
        }
        dimensions.push((name.as_str(), values));
    }
    if dimensions.is_empty() {
        return Err(Error::NoParameters);
    }

    let total: usize = dimensions.iter().map(|(_, values)| values.len()).product();
    let mut jobs = Vec::with_capacity(total);
    let mut counter = vec![0usize; dimensions.len()];

    loop {
        let values = dimensions
            .iter()
            .zip(&counter)
            .map(|((name, values), &digit)| (name.to_string(), values[digit].clone()))
            .collect();
        jobs.push(Job {
            id: jobs.len() + 1,
            values,
        });

        // Increment the last digit, carrying leftwards.
        let mut exhausted = true;
        for (digit, (_, values)) in counter.iter_mut().zip(&dimensions).rev() {
            *digit += 1;
            if *digit < values.len() {
                exhausted = false;
                break;
            }
            *digit = 0;
        }
        if exhausted {
            break;
        }
    }

    debug!(
        dimensions = dimensions.len(),
        jobs = jobs.len(),
        "full-factorial design generated"
    );
    Ok(jobs)
}

/// The ordered set of jobs for one experiment run.
#[derive(Debug, Clone, PartialEq)]
pub struct Design {
    job_id_name: String,
    parameter_names: Vec<String>,
    jobs: Vec<Job>,
}

impl Design {
    /// Builds the full-factorial design over `parameters`.
    pub fn full_factorial(
        parameters: &IndexMap<String, Levels>,
        job_id_name: &str,
    ) -> Result<Self> {
        let jobs = full_factorial_design(parameters, job_id_name)?;
        Ok(Self {
            job_id_name: job_id_name.to_string(),
            parameter_names: parameters.keys().cloned().collect(),
            jobs,
        })
    }

    /// A design with exactly one job carrying `values`.
    ///
    /// Covers experiments without swept parameters, including those with
    /// no parameters at all.
    pub fn single(values: IndexMap<String, ParamValue>, job_id_name: &str) -> Self {
        Self {
            job_id_name: job_id_name.to_string(),
            parameter_names: values.keys().cloned().collect(),
            jobs: vec![Job { id: 1, values }],
        }
    }

    pub fn job_id_name(&self) -> &str {
        &self.job_id_name
    }

    /// Column names in declaration order.
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Job> {
        self.jobs.iter()
    }

    /// Looks up a job by id.
    pub fn get(&self, job_id: usize) -> Option<&Job> {
        job_id
            .checked_sub(1)
            .and_then(|index| self.jobs.get(index))
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl<'a> IntoIterator for &'a Design {
    type Item = &'a Job;
    type IntoIter = std::slice::Iter<'a, Job>;

    fn into_iter(self) -> Self::IntoIter {
        self.jobs.iter()
    }
}
