//! Field extraction and validation against a product document

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;
use xpath_schema::{
    Document, ErrorKind, Extracted, Field, FieldOptions, FieldOutcome, ListField, NamespaceMap,
    SchemaField, StepResolver, Value,
};

const PRODUCT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Товар>
    <Ид>a9104793-9174-11eb-972c-38607706b20d</Ид>
    <НомерВерсии>AAAAAAAAAAE=57978</НомерВерсии>
    <ПометкаУдаления>true</ПометкаУдаления>
    <Штрихкод/>
    <Артикул>1</Артикул>
    <Наименование>Кофе</Наименование>
    <БазоваяЕдиница>796</БазоваяЕдиница>
    <Группы>
        <Ид>ec50ae26-916a-11eb-972c-38607706b20d</Ид>
    </Группы>
    <Описание/>
    <СтавкиНалогов>
        <СтавкаНалога>
            <Наименование>НДС</Наименование>
            <Ставка>Без налога</Ставка>
        </СтавкаНалога>
        <СтавкаНалога>
            <Наименование>НДС</Наименование>
            <Ставка>Без налога</Ставка>
        </СтавкаНалога>
    </СтавкиНалогов>
    <Вес>0.12</Вес>
</Товар>"#;

const NAMESPACED_PRODUCT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Товар xmlns="urn:1C.ru:commerceml_2">
    <Ид>a9104793-9174-11eb-972c-38607706b20d</Ид>
    <ПометкаУдаления>true</ПометкаУдаления>
    <Наименование>Кофе</Наименование>
</Товар>"#;

fn value_of<F: SchemaField>(field: &F, xml: &str) -> Value {
    let doc = Document::parse(xml).unwrap();
    match field.run(doc.root_element(), &StepResolver) {
        FieldOutcome::Value(value) => value,
        other => panic!("expected a value, got {:?}", other),
    }
}

fn error_of<F: SchemaField>(field: &F, xml: &str) -> ErrorKind {
    let doc = Document::parse(xml).unwrap();
    match field.run(doc.root_element(), &StepResolver) {
        FieldOutcome::Error(detail) => detail.error_kind().unwrap(),
        other => panic!("expected an error, got {:?}", other),
    }
}

// ============================================================================
// Extraction
// ============================================================================

#[test]
fn test_extract_single_and_absent() {
    let doc = Document::parse(PRODUCT).unwrap();

    let field = Field::raw().with_path("/Товар").unwrap();
    let extracted = field.extract(doc.root_element(), &StepResolver).unwrap();
    assert_eq!(extracted, Extracted::One(doc.root_element()));

    let field = Field::raw().with_path("/НеТовар").unwrap();
    let extracted = field.extract(doc.root_element(), &StepResolver).unwrap();
    assert_eq!(extracted, Extracted::Absent);
}

#[test]
fn test_extract_ambiguous() {
    let doc = Document::parse(PRODUCT).unwrap();
    let field = Field::raw()
        .with_path("/Товар/СтавкиНалогов/СтавкаНалога")
        .unwrap();
    let detail = field.extract(doc.root_element(), &StepResolver).unwrap_err();
    let error = detail.as_error().unwrap();
    assert_eq!(error.kind, ErrorKind::AmbiguousMatch);
    assert_eq!(error.path.as_deref(), Some("/Товар/СтавкиНалогов/СтавкаНалога"));
}

#[test]
fn test_list_extraction_is_never_ambiguous() {
    let doc = Document::parse(PRODUCT).unwrap();
    let field = ListField::raw()
        .with_path("/Товар/СтавкиНалогов/СтавкаНалога")
        .unwrap();
    match field.extract(doc.root_element(), &StepResolver).unwrap() {
        Extracted::Many(nodes) => assert_eq!(nodes.len(), 2),
        other => panic!("expected many, got {:?}", other),
    }
    let value = value_of(&field, PRODUCT);
    assert_eq!(value.as_list().map(<[Value]>::len), Some(2));
}

#[test]
fn test_namespaced_document() {
    let unprefixed = Field::raw().with_path("/Товар").unwrap().required(false);
    let doc = Document::parse(NAMESPACED_PRODUCT).unwrap();
    assert_eq!(
        unprefixed.extract(doc.root_element(), &StepResolver).unwrap(),
        Extracted::Absent
    );
    assert_eq!(unprefixed.run(doc.root_element(), &StepResolver), FieldOutcome::Skip);

    let prefixed = Field::raw()
        .with_path("/p:Товар")
        .unwrap()
        .with_namespaces(NamespaceMap::new().with_prefix("p", "urn:1C.ru:commerceml_2"));
    assert_eq!(
        prefixed.extract(doc.root_element(), &StepResolver).unwrap(),
        Extracted::One(doc.root_element())
    );
}

// ============================================================================
// Coercion
// ============================================================================

#[test]
fn test_boolean_field() {
    let field = Field::boolean().with_path("/Товар/ПометкаУдаления").unwrap();
    assert_eq!(value_of(&field, PRODUCT), Value::Bool(true));
}

#[test]
fn test_char_field() {
    let field = Field::text().with_path("/Товар/Наименование").unwrap();
    assert_eq!(value_of(&field, PRODUCT), Value::from("Кофе"));
}

#[test]
fn test_uuid_field() {
    let field = Field::uuid().with_path("/Товар/Ид").unwrap();
    assert_eq!(
        value_of(&field, PRODUCT),
        Value::Uuid(Uuid::parse_str("a9104793-9174-11eb-972c-38607706b20d").unwrap())
    );
}

#[test]
fn test_integer_field() {
    let field = Field::integer().with_path("/Товар/БазоваяЕдиница").unwrap();
    assert_eq!(value_of(&field, PRODUCT), Value::Integer(796));
}

#[test]
fn test_float_field() {
    let field = Field::float().with_path("/Товар/Вес").unwrap();
    assert_eq!(value_of(&field, PRODUCT), Value::Float(0.12));
}

#[test]
fn test_decimal_field() {
    let field = Field::decimal(Some(3), Some(2)).with_path("/Товар/Вес").unwrap();
    assert_eq!(
        value_of(&field, PRODUCT),
        Value::Decimal(Decimal::from_str("0.12").unwrap())
    );

    let narrow = Field::decimal(Some(2), Some(1)).with_path("/Товар/Вес").unwrap();
    assert_eq!(error_of(&narrow, PRODUCT), ErrorKind::DigitsOutOfRange);
}

#[test]
fn test_list_field() {
    let field = ListField::new(Field::uuid())
        .unwrap()
        .with_path("/Товар/Группы/Ид")
        .unwrap();
    assert_eq!(
        value_of(&field, PRODUCT),
        Value::List(vec![Value::Uuid(
            Uuid::parse_str("ec50ae26-916a-11eb-972c-38607706b20d").unwrap()
        )])
    );
}

#[test]
fn test_raw_field_passes_content_through() {
    let field = Field::raw().with_path("/Товар/НомерВерсии").unwrap();
    assert_eq!(value_of(&field, PRODUCT), Value::Raw("AAAAAAAAAAE=57978".to_string()));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_malformed_content() {
    let field = Field::boolean().with_path("/Товар/Наименование").unwrap();
    assert_eq!(error_of(&field, PRODUCT), ErrorKind::InvalidBoolean);

    let field = Field::integer().with_path("/Товар/Вес").unwrap();
    assert_eq!(error_of(&field, PRODUCT), ErrorKind::InvalidNumber);

    let field = Field::uuid().with_path("/Товар/Артикул").unwrap();
    assert_eq!(error_of(&field, PRODUCT), ErrorKind::InvalidIdentifier);
}

#[test]
fn test_empty_elements() {
    let field = Field::text().with_path("/Товар/Описание").unwrap();
    assert_eq!(error_of(&field, PRODUCT), ErrorKind::BlankNotAllowed);

    let field = Field::text()
        .allow_blank(true)
        .with_path("/Товар/Описание")
        .unwrap();
    assert_eq!(value_of(&field, PRODUCT), Value::from(""));

    let field = Field::text()
        .with_path("/Товар/Описание")
        .unwrap()
        .allow_null(true);
    assert_eq!(value_of(&field, PRODUCT), Value::Null);

    let field = Field::decimal(None, None).with_path("/Товар/Штрихкод").unwrap();
    assert_eq!(error_of(&field, PRODUCT), ErrorKind::NullNotAllowed);
}

#[test]
fn test_absent_optional_field_with_default() {
    let field = Field::integer()
        .with_path("/Товар/Остаток")
        .unwrap()
        .with_default(0i64);
    assert_eq!(value_of(&field, PRODUCT), Value::Integer(0));
}

#[test]
fn test_bounds_are_validators() {
    let field = Field::integer()
        .with_path("/Товар/БазоваяЕдиница")
        .unwrap()
        .min_value(1000);
    assert_eq!(error_of(&field, PRODUCT), ErrorKind::OutOfRange);

    let field = ListField::raw()
        .with_path("/Товар/СтавкиНалогов/СтавкаНалога")
        .unwrap()
        .min_length(3);
    assert_eq!(error_of(&field, PRODUCT), ErrorKind::LengthOutOfRange);
}
