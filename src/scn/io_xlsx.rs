use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::scn::*;

const OTHERS_HEADERS: [&str; 2] = ["others", "outros"];

/// Reads the first worksheet of an Excel file: a header row `region, names...` followed by
/// one row of votes per region.
pub fn read_vote_table(path: &str, round: Option<RoundMode>) -> ScnResult<ScenarioStore> {
    info!("read_vote_table: path: {:?}", path);
    let mut workbook: Xlsx<_> = open_workbook(path).context(OpeningExcelSnafu { path })?;
    let wrange = workbook
        .worksheet_range_at(0)
        .context(EmptyExcelSnafu {})?
        .context(OpeningExcelSnafu { path })?;
    parse_vote_table(wrange.rows(), round)
}

pub fn parse_vote_table<'a>(
    mut rows: impl Iterator<Item = &'a [DataType]>,
    round: Option<RoundMode>,
) -> ScnResult<ScenarioStore> {
    let header = rows.next().context(EmptyExcelSnafu {})?;
    debug!("parse_vote_table: header: {:?}", header);
    let mut names: Vec<String> = Vec::new();
    for cell in header.iter().skip(1) {
        match cell {
            DataType::String(s) if !s.trim().is_empty() => names.push(s.trim().to_string()),
            DataType::Empty => break,
            _ => {
                return Err(ScnError::ExcelWrongCellType {
                    lineno: 0,
                    content: format!("{:?}", cell),
                });
            }
        }
    }
    let has_others = names
        .last()
        .map(|n| OTHERS_HEADERS.contains(&n.to_lowercase().as_str()))
        .unwrap_or(false);
    let specs: Vec<CandidateSpec> = names
        .iter()
        .take(names.len() - has_others as usize)
        .map(|n| CandidateSpec::named(n))
        .collect();
    let round = round.unwrap_or(if !has_others && specs.len() == 2 {
        RoundMode::SecondRound
    } else {
        RoundMode::FirstRound
    });
    let mut builder = ScenarioBuilder::new(round)
        .candidate_specs(&specs)
        .context(InvalidScenarioSnafu {})?;
    let num_columns = match round {
        RoundMode::FirstRound => specs.len() + 1,
        RoundMode::SecondRound => specs.len(),
    };

    for (idx, row) in rows.enumerate() {
        let lineno = (idx + 1) as u64;
        let region = match row.first() {
            Some(DataType::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(DataType::Empty) | None => {
                debug!("parse_vote_table: skipping row {}", lineno);
                continue;
            }
            Some(x) => {
                return Err(ScnError::ExcelWrongCellType {
                    lineno,
                    content: format!("{:?}", x),
                });
            }
        };
        let mut counts: Vec<u64> = Vec::with_capacity(num_columns);
        for col in 0..names.len() {
            counts.push(read_count(row.get(col + 1), lineno)?);
        }
        // The "Others" candidate of a first round gets zero votes without an Others column.
        counts.resize(num_columns, 0);
        debug!("parse_vote_table: {} -> {:?}", region, counts);
        builder
            .add_region(&region, &counts)
            .context(InvalidScenarioSnafu {})?;
    }
    Ok(builder.build())
}

fn read_count(cell: Option<&DataType>, lineno: u64) -> ScnResult<u64> {
    match cell {
        None | Some(DataType::Empty) => Ok(0),
        Some(DataType::Int(i)) if *i >= 0 => Ok(*i as u64),
        Some(DataType::Float(f)) if *f >= 0.0 && f.is_finite() => Ok(f.round() as u64),
        Some(DataType::String(s)) => match s.trim().parse::<u64>() {
            Ok(x) => Ok(x),
            Err(_) => ExcelWrongCellTypeSnafu {
                lineno,
                content: s.clone(),
            }
            .fail(),
        },
        Some(x) => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", x),
        }
        .fail(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(x: &str) -> DataType {
        DataType::String(x.to_string())
    }

    #[test]
    fn first_round_with_others_column() {
        let rows = vec![
            vec![s("region"), s("Anna"), s("Bob"), s("Outros")],
            vec![s("BR-SP"), DataType::Float(5000.0), DataType::Int(4000), DataType::Int(1000)],
            vec![s("BR-RJ"), DataType::Int(2600), s("2400"), DataType::Empty],
            vec![DataType::Empty, DataType::Empty],
        ];
        let store = parse_vote_table(rows.iter().map(|r| r.as_slice()), None).unwrap();
        assert_eq!(store.round_mode(), RoundMode::FirstRound);
        let names: Vec<&str> = store.candidates().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Anna", "Bob", "Others"]);
        assert!(store.candidates()[2].is_others);
        assert_eq!(
            store.votes().get(&RegionId::new("BR-RJ")).unwrap(),
            &[2600, 2400, 0]
        );
        assert_eq!(store.votes().len(), 2);
    }

    #[test]
    fn two_names_make_a_second_round() {
        let rows = vec![
            vec![s("region"), s("Anna"), s("Bob")],
            vec![s("BR-SP"), DataType::Int(7), DataType::Int(3)],
        ];
        let store = parse_vote_table(rows.iter().map(|r| r.as_slice()), None).unwrap();
        assert_eq!(store.round_mode(), RoundMode::SecondRound);

        let store = parse_vote_table(
            rows.iter().map(|r| r.as_slice()),
            Some(RoundMode::FirstRound),
        )
        .unwrap();
        assert_eq!(
            store.votes().get(&RegionId::new("BR-SP")).unwrap(),
            &[7, 3, 0]
        );
    }

    #[test]
    fn wrong_cells() {
        let rows = vec![
            vec![s("region"), s("Anna"), s("Bob")],
            vec![s("BR-SP"), DataType::Int(-7), DataType::Int(3)],
        ];
        let r = parse_vote_table(rows.iter().map(|r| r.as_slice()), None);
        assert!(matches!(
            r,
            Err(ScnError::ExcelWrongCellType { lineno: 1, .. })
        ));
        let empty: Vec<Vec<DataType>> = Vec::new();
        assert!(matches!(
            parse_vote_table(empty.iter().map(|r| r.as_slice()), None),
            Err(ScnError::EmptyExcel {})
        ));
    }
}
