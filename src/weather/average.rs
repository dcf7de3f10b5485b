use crate::collection::CombineFn;
use crate::error::{PipelineError, StageResult};
use crate::weather::model::{Aggregate, GroupKey, Measurement};
use std::any::Any;

/// Neumaier-compensated sum.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.compensation += (self.sum - t) + x;
        } else {
            self.compensation += (x - t) + self.sum;
        }
        self.sum = t;
    }

    fn merge(&mut self, other: CompensatedSum) {
        self.add(other.sum);
        self.compensation += other.compensation;
    }

    fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Partial state of a per-group average: compensated sums plus the number
/// of readings folded in.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    temperature: CompensatedSum,
    windspeed: CompensatedSum,
    count: u64,
}

impl RunningMean {
    /// Fold in one measurement, which may itself be a partial sum.
    pub fn push(&mut self, m: &Measurement) -> StageResult<()> {
        if m.count == 0 {
            return Err(PipelineError::invariant(
                "measurement with zero count reached the averager",
            ));
        }
        if !m.temperature.is_finite() || !m.windspeed.is_finite() {
            return Err(PipelineError::invariant(format!(
                "non-finite measurement reached the averager: temperature={}, windspeed={}",
                m.temperature, m.windspeed
            )));
        }
        self.count = self
            .count
            .checked_add(m.count)
            .ok_or_else(|| PipelineError::invariant("observation count overflowed"))?;
        self.temperature.add(m.temperature);
        self.windspeed.add(m.windspeed);
        Ok(())
    }

    /// Fold in another partial state.
    pub fn merge(&mut self, other: RunningMean) -> StageResult<()> {
        self.count = self
            .count
            .checked_add(other.count)
            .ok_or_else(|| PipelineError::invariant("observation count overflowed"))?;
        self.temperature.merge(other.temperature);
        self.windspeed.merge(other.windspeed);
        Ok(())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Divide the sums by the count. An empty state yields [`Aggregate::EMPTY`].
    pub fn finish(&self) -> Aggregate {
        if self.count == 0 {
            return Aggregate::EMPTY;
        }
        let n = self.count as f64;
        Aggregate {
            avg_temperature: Some(self.temperature.value() / n),
            avg_windspeed: Some(self.windspeed.value() / n),
        }
    }
}

/// Reduces the measurements of one group to mean temperature and windspeed.
///
/// Usable directly on a grouped value list through [`average`](Self::average),
/// or as a [`CombineFn`] so the reduction runs as partial sums per partition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Averager;

impl Averager {
    pub fn average(&self, group: &[Measurement]) -> StageResult<Aggregate> {
        let mut acc = RunningMean::default();
        for m in group {
            acc.push(m)?;
        }
        Ok(acc.finish())
    }
}

impl CombineFn<Measurement, RunningMean, Aggregate> for Averager {
    fn create(&self) -> RunningMean {
        RunningMean::default()
    }

    fn add_input(&self, acc: &mut RunningMean, v: Measurement) -> anyhow::Result<()> {
        acc.push(&v)?;
        Ok(())
    }

    fn merge(&self, acc: &mut RunningMean, other: RunningMean) -> anyhow::Result<()> {
        acc.merge(other)?;
        Ok(())
    }

    fn finish(&self, acc: RunningMean) -> Aggregate {
        acc.finish()
    }

    fn keyed_error(&self, key: &dyn Any, err: anyhow::Error) -> anyhow::Error {
        match (key.downcast_ref::<GroupKey>(), err.downcast::<PipelineError>()) {
            (Some(key), Ok(e)) => e.with_key(key).into(),
            (None, Ok(e)) => e.into(),
            (_, Err(err)) => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn single_measurement_averages_to_itself() {
        let agg = Averager.average(&[Measurement::single(10.0, 5.0)]).unwrap();
        assert_eq!(agg.avg_temperature, Some(10.0));
        assert_eq!(agg.avg_windspeed, Some(5.0));
    }

    #[test]
    fn two_measurements_average_componentwise() {
        let agg = Averager
            .average(&[Measurement::single(10.0, 5.0), Measurement::single(20.0, 15.0)])
            .unwrap();
        assert_eq!(agg.avg_temperature, Some(15.0));
        assert_eq!(agg.avg_windspeed, Some(10.0));
    }

    #[test]
    fn empty_group_has_no_averages() {
        assert_eq!(Averager.average(&[]).unwrap(), Aggregate::EMPTY);
    }

    #[test]
    fn partial_sums_weigh_by_count() {
        let partial = Measurement {
            temperature: 30.0,
            windspeed: 20.0,
            count: 2,
        };
        let agg = Averager
            .average(&[partial, Measurement::single(0.0, 2.0)])
            .unwrap();
        assert_eq!(agg.avg_temperature, Some(10.0));
        assert_eq!(agg.avg_windspeed, Some(22.0 / 3.0));
    }

    #[test]
    fn order_does_not_change_the_result() {
        let ms: Vec<Measurement> = (0..50)
            .map(|i| Measurement::single(0.1 * i as f64 - 2.0, 1e6 + i as f64 * 0.3))
            .collect();
        let forward = Averager.average(&ms).unwrap();
        let mut rev = ms.clone();
        rev.reverse();
        let backward = Averager.average(&rev).unwrap();
        assert_relative_eq!(
            forward.avg_temperature.unwrap(),
            backward.avg_temperature.unwrap(),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            forward.avg_windspeed.unwrap(),
            backward.avg_windspeed.unwrap(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn compensated_sum_keeps_small_terms() {
        let mut s = CompensatedSum::default();
        s.add(1e16);
        s.add(1.0);
        s.add(-1e16);
        assert_eq!(s.value(), 1.0);
    }

    #[test]
    fn zero_count_is_an_invariant_violation() {
        let bad = Measurement {
            temperature: 1.0,
            windspeed: 1.0,
            count: 0,
        };
        let err = Averager.average(&[Measurement::single(1.0, 1.0), bad]).unwrap_err();
        assert!(matches!(err, PipelineError::InvariantViolation { .. }));
    }

    #[test]
    fn non_finite_values_are_an_invariant_violation() {
        let err = Averager
            .average(&[Measurement::single(f64::INFINITY, 1.0)])
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvariantViolation { .. }));
    }

    #[test]
    fn merged_partials_match_a_single_pass() {
        let ms = [
            Measurement::single(1.0, 2.0),
            Measurement::single(3.0, 4.0),
            Measurement::single(5.0, 6.0),
        ];
        let mut left = Averager.create();
        Averager.add_input(&mut left, ms[0]).unwrap();
        let mut right = Averager.create();
        Averager.add_input(&mut right, ms[1]).unwrap();
        Averager.add_input(&mut right, ms[2]).unwrap();
        Averager.merge(&mut left, right).unwrap();
        assert_eq!(left.count(), 3);
        assert_eq!(Averager.finish(left), Averager.average(&ms).unwrap());
    }

    #[test]
    fn combiner_failures_name_their_group() {
        let key = GroupKey::new("NYC", "2024-03-01");
        let bad = Measurement {
            temperature: 1.0,
            windspeed: 1.0,
            count: 0,
        };
        let p = crate::Pipeline::default();
        let err = crate::from_vec(
            &p,
            vec![
                (GroupKey::new("LA", "2024-03-01"), Measurement::single(3.0, 2.0)),
                (key.clone(), Measurement::single(10.0, 5.0)),
                (key.clone(), bad),
            ],
        )
        .combine_values(Averager)
        .collect_seq()
        .unwrap_err();

        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::InvariantViolation { key: Some(k), .. }) => assert_eq!(*k, key),
            other => panic!("expected a keyed InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn keyed_error_leaves_foreign_errors_alone() {
        let err = Averager.keyed_error(&7u32, anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "disk full");

        let err = Averager.keyed_error(&7u32, PipelineError::invariant("zero count").into());
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvariantViolation { key: None, .. })
        ));
    }
}
