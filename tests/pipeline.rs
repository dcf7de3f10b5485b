use anyhow::Result;
use approx::assert_relative_eq;
use weather_summary::job::{STEP_EXTRACT, build_summary, summarize};
use weather_summary::testing::*;
use weather_summary::weather::{FieldValue, RawObservation, Row};
use weather_summary::{ExecMode, PipelineError, Runner, Strategy, from_vec};

fn runners() -> Vec<Runner> {
    vec![
        Runner::new(ExecMode::Sequential),
        Runner::new(ExecMode::Parallel {
            threads: None,
            partitions: Some(1),
        }),
        Runner::new(ExecMode::Parallel {
            threads: Some(2),
            partitions: Some(3),
        }),
        Runner::new(ExecMode::Parallel {
            threads: None,
            partitions: Some(16),
        }),
    ]
}

#[test]
fn reference_readings_summarize_to_two_rows() -> Result<()> {
    for strategy in [Strategy::Group, Strategy::Combine] {
        for runner in runners() {
            let rows = summarize(reference_observations(), strategy, &runner)?;
            assert_rows_approx_eq(&rows, &reference_rows(), 1e-12);
        }
    }
    Ok(())
}

#[test]
fn rows_come_back_sorted_by_city_then_date() -> Result<()> {
    let input = vec![
        obs("Oslo", 1.0, 1.0, "2024-03-02T10:00:00Z"),
        obs("Bergen", 2.0, 2.0, "2024-03-02T10:00:00Z"),
        obs("Oslo", 3.0, 3.0, "2024-03-01T10:00:00Z"),
    ];
    let rows = summarize(input, Strategy::Group, &Runner::default())?;
    let keys: Vec<(&str, &str)> = rows.iter().map(Row::sort_key).collect();
    assert_eq!(
        keys,
        vec![
            ("Bergen", "2024-03-02"),
            ("Oslo", "2024-03-01"),
            ("Oslo", "2024-03-02"),
        ]
    );
    Ok(())
}

#[test]
fn day_boundaries_split_groups() -> Result<()> {
    let input = vec![
        obs("NYC", 0.0, 0.0, "2024-03-01T00:00:01"),
        obs("NYC", 10.0, 10.0, "2024-03-01T23:59:00"),
        obs("NYC", 100.0, 100.0, "2024-03-02T00:00:00"),
    ];
    let rows = summarize(input, Strategy::Group, &Runner::new(ExecMode::Sequential))?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, "2024-03-01");
    assert_eq!(rows[0].avg_temperature, Some(5.0));
    assert_eq!(rows[1].avg_temperature, Some(100.0));
    Ok(())
}

#[test]
fn every_group_has_at_least_one_reading() -> Result<()> {
    let input = synthetic_observations(&["A", "B", "C"], 4, 5);
    let rows = summarize(input, Strategy::Combine, &Runner::default())?;
    assert_eq!(rows.len(), 3 * 4);
    assert!(rows.iter().all(|r| r.avg_temperature.is_some() && r.avg_windspeed.is_some()));
    Ok(())
}

#[test]
fn results_do_not_depend_on_input_order() -> Result<()> {
    let base = synthetic_observations(&["Lima", "Quito"], 3, 40);
    let expected = summarize(base.clone(), Strategy::Group, &Runner::new(ExecMode::Sequential))?;

    let mut reversed = base.clone();
    reversed.reverse();
    let mut rotated = base.clone();
    rotated.rotate_left(17);
    let mut interleaved: Vec<RawObservation> = base.iter().step_by(2).cloned().collect();
    interleaved.extend(base.iter().skip(1).step_by(2).cloned());

    for input in [reversed, rotated, interleaved] {
        for strategy in [Strategy::Group, Strategy::Combine] {
            let rows = summarize(input.clone(), strategy, &Runner::default())?;
            assert_eq!(rows.len(), expected.len());
            for (a, e) in rows.iter().zip(&expected) {
                assert_eq!(a.sort_key(), e.sort_key());
                assert_relative_eq!(
                    a.avg_temperature.unwrap(),
                    e.avg_temperature.unwrap(),
                    max_relative = 1e-9
                );
                assert_relative_eq!(
                    a.avg_windspeed.unwrap(),
                    e.avg_windspeed.unwrap(),
                    max_relative = 1e-9
                );
            }
        }
    }
    Ok(())
}

#[test]
fn missing_temperature_aborts_with_malformed_record() {
    let mut input = reference_observations();
    input[2].temperature = None;

    for runner in runners() {
        for strategy in [Strategy::Group, Strategy::Combine] {
            let err = summarize(input.clone(), strategy, &runner).unwrap_err();
            match err.downcast_ref::<PipelineError>() {
                Some(PipelineError::MalformedRecord { reason, record }) => {
                    assert!(reason.contains("temperature"));
                    assert_eq!(record.city, Some(FieldValue::from("LA")));
                }
                other => panic!("expected MalformedRecord, got {other:?}"),
            }
            assert!(format!("{err:#}").contains(STEP_EXTRACT));
        }
    }
}

#[test]
fn numeric_text_fields_are_averaged() -> Result<()> {
    let input = vec![
        RawObservation {
            temperature: Some(FieldValue::Text("12".into())),
            windspeed: Some(FieldValue::Text(" 4.5 ".into())),
            ..obs("Lagos", 0.0, 0.0, "2024-03-01 09:00:00 UTC")
        },
        obs("Lagos", 14.0, 5.5, "2024-03-01 15:00:00 UTC"),
    ];
    let rows = summarize(input, Strategy::Group, &Runner::default())?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].avg_temperature, Some(13.0));
    assert_eq!(rows[0].avg_windspeed, Some(5.0));
    Ok(())
}

#[test]
fn empty_input_produces_no_rows() -> Result<()> {
    for strategy in [Strategy::Group, Strategy::Combine] {
        assert!(summarize(Vec::new(), strategy, &Runner::default())?.is_empty());
    }
    Ok(())
}

#[test]
fn summary_graph_is_labelled() {
    let p = TestPipeline::new();
    let _ = build_summary(from_vec(&p, reference_observations()), Strategy::Group);
    assert_eq!(
        p.step_labels()[1..],
        [
            "Extract Key".to_string(),
            "Group by city+date".to_string(),
            "Compute Averages".to_string(),
            "Format Output".to_string(),
        ]
    );

    let p = TestPipeline::new();
    let _ = build_summary(from_vec(&p, reference_observations()), Strategy::Combine);
    assert_eq!(p.node_count(), 4);
}
