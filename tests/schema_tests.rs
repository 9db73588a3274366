//! Schemas applied to whole documents

use pretty_assertions::assert_eq;
use serde_json::json;
use xpath_schema::{
    Document, Error, ErrorDetail, ErrorKind, Extracted, Field, FieldError, FieldOptions, ListField,
    NamespaceMap, RecordValidator, Schema, SchemaField, StepResolver, Value, NON_FIELD_ERRORS_KEY,
};

const PRODUCT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Товар>
    <Ид>a9104793-9174-11eb-972c-38607706b20d</Ид>
    <Наименование>Кофе</Наименование>
    <Группы>
        <Ид>ec50ae26-916a-11eb-972c-38607706b20d</Ид>
    </Группы>
</Товар>"#;

const NAMESPACED_PRODUCT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Товар xmlns="urn:1C.ru:commerceml_2">
    <Ид>a9104793-9174-11eb-972c-38607706b20d</Ид>
    <Группы>
        <Ид>ec50ae26-916a-11eb-972c-38607706b20d</Ид>
    </Группы>
</Товар>"#;

const OFFERS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<КоммерческаяИнформация ВерсияСхемы="2.10">
    <Предложение>
        <Ид>a9104793-9174-11eb-972c-38607706b20d</Ид>
        <Цены>
            <Цена>
                <ИдТипаЦены>bf0bcd36-9174-11eb-972c-38607706b20d</ИдТипаЦены>
                <ЦенаЗаЕдиницу>100</ЦенаЗаЕдиницу>
                <Валюта>RUB</Валюта>
            </Цена>
            <Цена>
                <ИдТипаЦены>c8f3b3a1-9174-11eb-972c-38607706b20d</ИдТипаЦены>
                <ЦенаЗаЕдиницу>120</ЦенаЗаЕдиницу>
                <Валюта>RUB</Валюта>
            </Цена>
        </Цены>
    </Предложение>
</КоммерческаяИнформация>"#;

fn product_schema() -> Schema {
    Schema::builder()
        .field("uuid", Field::uuid().with_path("/Товар/Ид").unwrap())
        .field(
            "group_uuids",
            ListField::new(Field::uuid())
                .unwrap()
                .with_path("/Товар/Группы/Ид")
                .unwrap(),
        )
        .build()
        .unwrap()
}

// ============================================================================
// Records
// ============================================================================

#[test]
fn test_schema_record() {
    let schema = product_schema();
    let record = schema.apply_str(PRODUCT).unwrap();

    assert_eq!(record.keys().collect::<Vec<_>>(), vec!["uuid", "group_uuids"]);
    assert_eq!(
        schema.represent(&record),
        json!({
            "uuid": "a9104793-9174-11eb-972c-38607706b20d",
            "group_uuids": ["ec50ae26-916a-11eb-972c-38607706b20d"]
        })
    );
}

#[test]
fn test_schema_many() {
    let price = Schema::builder()
        .path("/КоммерческаяИнформация/Предложение/Цены/Цена")
        .field("value", Field::integer().with_path("ЦенаЗаЕдиницу").unwrap())
        .build_many()
        .unwrap();
    let offer = Schema::builder().field("prices", price).build().unwrap();

    let record = offer.apply_str(OFFERS).unwrap();
    assert_eq!(
        offer.represent(&record),
        json!({"prices": [{"value": 100}, {"value": 120}]})
    );
}

#[test]
fn test_nested_schema() {
    let price = Schema::builder()
        .path("Цены/Цена")
        .field("currency", Field::text().with_path("Валюта").unwrap())
        .field("value", Field::decimal(Some(10), Some(2)).with_path("ЦенаЗаЕдиницу").unwrap())
        .build_many()
        .unwrap();
    let offer = Schema::builder()
        .path("/КоммерческаяИнформация/Предложение")
        .field("uuid", Field::uuid().with_path("Ид").unwrap())
        .field("prices", price)
        .build()
        .unwrap();

    let record = offer.apply_str(OFFERS).unwrap();
    assert_eq!(
        offer.represent(&record),
        json!({
            "uuid": "a9104793-9174-11eb-972c-38607706b20d",
            "prices": [
                {"currency": "RUB", "value": "100"},
                {"currency": "RUB", "value": "120"}
            ]
        })
    );
}

#[test]
fn test_namespaced_schema() {
    let namespaces = NamespaceMap::new().with_prefix("p", "urn:1C.ru:commerceml_2");
    let schema = Schema::builder()
        .field(
            "uuid",
            Field::uuid()
                .with_path("/p:Товар/p:Ид")
                .unwrap()
                .with_namespaces(namespaces.clone()),
        )
        .field(
            "group_uuids",
            ListField::new(Field::uuid())
                .unwrap()
                .with_path("/p:Товар/p:Группы/p:Ид")
                .unwrap()
                .with_namespaces(namespaces),
        )
        .build()
        .unwrap();

    let record = schema.apply_str(NAMESPACED_PRODUCT).unwrap();
    assert_eq!(
        schema.represent(&record),
        json!({
            "uuid": "a9104793-9174-11eb-972c-38607706b20d",
            "group_uuids": ["ec50ae26-916a-11eb-972c-38607706b20d"]
        })
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unprefixed_paths_miss_namespaced_elements() {
    let err = product_schema().apply_str(NAMESPACED_PRODUCT).unwrap_err();
    let Error::Validation(detail) = err else {
        panic!("expected validation error, got {:?}", err);
    };
    let fields = detail.as_fields().unwrap();
    assert_eq!(
        fields.get("uuid").and_then(ErrorDetail::error_kind),
        Some(ErrorKind::RequiredMissing)
    );
    // A list that matched nothing is an empty list, not a missing field
    assert!(!fields.contains_key("group_uuids"));
}

#[test]
fn test_errors_by_position() {
    let xml = r#"<Root>
        <Items>
            <Item><Value>1</Value></Item>
            <Item><Value>x</Value></Item>
            <Item><Value>3</Value></Item>
        </Items>
    </Root>"#;
    let items = Schema::builder()
        .path("/Root/Items/Item")
        .field("value", Field::integer().with_path("Value").unwrap())
        .build_many()
        .unwrap();
    let root = Schema::builder().field("items", items).build().unwrap();

    let doc = Document::parse(xml).unwrap();
    let detail = root.apply_document(&doc).unwrap_err();
    assert_eq!(detail.leaf_count(), 1);
    assert_eq!(
        detail.to_json(),
        json!({
            "items": {
                "1": {
                    "value": {
                        "code": "invalid_number",
                        "message": "A valid integer is required.",
                        "path": "Value"
                    }
                }
            }
        })
    );
}

#[test]
fn test_every_failing_field_is_reported() {
    let xml = r#"<Товар>
        <Ид>not-a-uuid</Ид>
        <ПометкаУдаления>maybe</ПометкаУдаления>
        <Наименование>Кофе</Наименование>
    </Товар>"#;
    let schema = Schema::builder()
        .field("uuid", Field::uuid().with_path("Ид").unwrap())
        .field("deleted", Field::boolean().with_path("ПометкаУдаления").unwrap())
        .field("name", Field::text().with_path("Наименование").unwrap())
        .field("sku", Field::text().with_path("Артикул").unwrap())
        .build()
        .unwrap();

    let doc = Document::parse(xml).unwrap();
    let detail = schema.apply(doc.root_element()).unwrap_err();
    let fields = detail.as_fields().unwrap();
    assert_eq!(
        fields.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["uuid", "deleted", "sku"]
    );
    assert_eq!(fields["sku"].error_kind(), Some(ErrorKind::RequiredMissing));
}

#[test]
fn test_record_validator() {
    let xml = r#"<Range><Min>5</Min><Max>3</Max></Range>"#;
    let schema = Schema::builder()
        .field("min", Field::integer().with_path("Min").unwrap())
        .field("max", Field::integer().with_path("Max").unwrap())
        .validator(RecordValidator::new("ordered", |record| {
            let min = record.get("min").and_then(Value::as_i64);
            let max = record.get("max").and_then(Value::as_i64);
            match (min, max) {
                (Some(min), Some(max)) if min > max => Err(FieldError::with_message(
                    ErrorKind::Invalid,
                    "min must not exceed max",
                )),
                _ => Ok(()),
            }
        }))
        .build()
        .unwrap();

    let doc = Document::parse(xml).unwrap();
    let detail = schema.apply(doc.root_element()).unwrap_err();
    let fields = detail.as_fields().unwrap();
    assert_eq!(
        fields[NON_FIELD_ERRORS_KEY].as_error().map(|e| e.message.as_str()),
        Some("min must not exceed max")
    );
}

#[test]
fn test_schema_rejects_non_element_input() {
    let xml = r#"<Товар Код="1"/>"#;
    let schema = Schema::builder()
        .field("name", Field::text().with_path("Наименование").unwrap())
        .build()
        .unwrap();

    let doc = Document::parse(xml).unwrap();
    let attribute = Field::raw().with_path("@Код").unwrap();
    let node = match attribute.extract(doc.root_element(), &StepResolver).unwrap() {
        Extracted::One(node) => node,
        other => panic!("expected one node, got {:?}", other),
    };
    let detail = schema.apply(node).unwrap_err();
    assert_eq!(detail.error_kind(), Some(ErrorKind::InvalidInput));
    assert_eq!(
        detail.as_error().map(|e| e.message.as_str()),
        Some("Invalid data. Expected an element, but got attribute.")
    );
}

// ============================================================================
// Configuration errors
// ============================================================================

#[test]
fn test_list_schema_requires_path() {
    let result = Schema::builder()
        .field("value", Field::integer().with_path("Value").unwrap())
        .build_many();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_duplicate_field_names() {
    let result = Schema::builder()
        .field("value", Field::integer())
        .field("value", Field::text())
        .build();
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_contradictory_field_options() {
    let result = Schema::builder()
        .field("value", Field::integer().required(true).with_default(1i64))
        .build();
    assert!(matches!(result, Err(Error::Config(_))));
}
