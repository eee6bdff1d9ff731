use obs_types::{FacetFilterSpec, ObsError, Variable};

/// Splits a decoded node-name token into its variable id and optional
/// facet filter (spec §4.7): `VariableId` or
/// `VariableId[k1=v1;k2=v2;...]` with recognized keys `mm`, `op`, `ut`,
/// `sf`.
pub fn parse_node_name(raw: &str) -> Result<(Variable, FacetFilterSpec), ObsError> {
    let (var_part, filter_part) = match raw.find('[') {
        None => (raw, None),
        Some(idx) => {
            if !raw.ends_with(']') {
                return Err(ObsError::invalid_argument(format!(
                    "node '{raw}' has an unterminated filter block"
                )));
            }
            (&raw[..idx], Some(&raw[idx + 1..raw.len() - 1]))
        }
    };

    let variable = Variable::new(var_part)?;
    let mut filter = FacetFilterSpec::default();
    if let Some(body) = filter_part {
        for clause in body.split(';') {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }
            let Some((key, value)) = clause.split_once('=') else {
                return Err(ObsError::invalid_argument(format!(
                    "node '{raw}' has a malformed filter clause '{clause}'"
                )));
            };
            let value = value.trim().to_owned();
            match key.trim() {
                "mm" => filter.measurement_method = Some(value),
                "op" => filter.observation_period = Some(value),
                "ut" => filter.unit = Some(value),
                "sf" => filter.scaling_factor = Some(value),
                other => {
                    return Err(ObsError::invalid_argument(format!(
                        "node '{raw}' has an unrecognized filter key '{other}'"
                    )))
                }
            }
        }
    }

    Ok((variable, filter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_variable_has_no_filter() {
        let (variable, filter) = parse_node_name("Count_Person").unwrap();
        assert_eq!(variable.as_str(), "Count_Person");
        assert_eq!(filter, FacetFilterSpec::default());
    }

    #[test]
    fn filter_block_parses_every_recognized_key() {
        let (variable, filter) =
            parse_node_name("Count_Person[mm=CensusPEPSurvey;op=P1Y;ut=Person;sf=1]").unwrap();
        assert_eq!(variable.as_str(), "Count_Person");
        assert_eq!(filter.measurement_method.as_deref(), Some("CensusPEPSurvey"));
        assert_eq!(filter.observation_period.as_deref(), Some("P1Y"));
        assert_eq!(filter.unit.as_deref(), Some("Person"));
        assert_eq!(filter.scaling_factor.as_deref(), Some("1"));
    }

    #[test]
    fn unrecognized_key_is_rejected() {
        assert!(parse_node_name("Count_Person[zz=1]").is_err());
    }

    #[test]
    fn unterminated_filter_block_is_rejected() {
        assert!(parse_node_name("Count_Person[mm=CensusPEPSurvey").is_err());
    }
}
