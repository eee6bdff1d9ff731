use obs_formula::{decode_node_token, encode_formula, parse_node_name};

/// Spec §8: "Encoding then decoding a formula yields the original string."
#[test]
fn encode_then_decode_is_the_identity_for_filtered_formulas() {
    let formulas = [
        "Count_Person",
        "Count_Person - Count_Person_Female",
        "Count_Person[mm=CensusPEPSurvey] / Count_Person[mm=CensusACS5yrSurvey;ut=USD/Person]",
        "(A + B) * C[op=P1Y;sf=1]",
    ];

    for formula in formulas {
        let encoded = encode_formula(formula);
        assert_eq!(decode_node_token(&encoded), formula);
    }
}

#[test]
fn node_name_round_trips_through_the_encoder_and_the_splitter() {
    let raw = "Count_Person[mm=CensusACS5yrSurvey;ut=USD/Person]";
    let encoded = encode_formula(raw);
    let decoded = decode_node_token(&encoded);
    assert_eq!(decoded, raw);

    let (variable, filter) = parse_node_name(&decoded).unwrap();
    assert_eq!(variable.as_str(), "Count_Person");
    assert_eq!(filter.measurement_method.as_deref(), Some("CensusACS5yrSurvey"));
    assert_eq!(filter.unit.as_deref(), Some("USD/Person"));
}
