use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use domain::{Todo, TodoId, UserId};
use std::collections::HashMap;

/// 単一テーブル設計のキー構造
///
/// ```text
/// PK     = TODO#<id>          SK     = TODO
/// GSI1PK = USER#<userId>      GSI1SK = <createdAt>#<id>
/// ```
/// 一覧は GSI1 を降順に読むことで新しい順になる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbKeys {
    pub pk: String,
    pub sk: String,
    pub gsi1_pk: String,
    pub gsi1_sk: String,
}

pub const GSI1_NAME: &str = "GSI1";
pub const TODO_SORT_KEY: &str = "TODO";
pub const ENTITY_TYPE_TODO: &str = "Todo";

impl DynamoDbKeys {
    pub fn for_todo(todo: &Todo) -> Self {
        Self {
            pk: Self::partition_key(&todo.id),
            sk: TODO_SORT_KEY.to_string(),
            gsi1_pk: Self::owner_key(&todo.user_id),
            gsi1_sk: format!("{}#{}", format_timestamp(&todo.created_at), todo.id),
        }
    }

    pub fn partition_key(id: &TodoId) -> String {
        format!("TODO#{id}")
    }

    pub fn owner_key(owner: &UserId) -> String {
        format!("USER#{owner}")
    }
}

/// ソートキーとして辞書順で比較できるよう、ナノ秒固定桁の RFC 3339 で出力する
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// ToDo を DynamoDB AttributeValue マップに変換
pub fn todo_to_item(todo: &Todo) -> HashMap<String, AttributeValue> {
    let keys = DynamoDbKeys::for_todo(todo);
    let mut map = HashMap::new();

    map.insert("PK".to_string(), AttributeValue::S(keys.pk));
    map.insert("SK".to_string(), AttributeValue::S(keys.sk));
    map.insert("GSI1PK".to_string(), AttributeValue::S(keys.gsi1_pk));
    map.insert("GSI1SK".to_string(), AttributeValue::S(keys.gsi1_sk));
    map.insert(
        "EntityType".to_string(),
        AttributeValue::S(ENTITY_TYPE_TODO.to_string()),
    );
    map.insert("Id".to_string(), AttributeValue::S(todo.id.to_string()));
    map.insert("Title".to_string(), AttributeValue::S(todo.title.clone()));
    map.insert("Completed".to_string(), AttributeValue::Bool(todo.completed));
    map.insert(
        "UserId".to_string(),
        AttributeValue::S(todo.user_id.to_string()),
    );
    map.insert(
        "CreatedAt".to_string(),
        AttributeValue::S(format_timestamp(&todo.created_at)),
    );

    map
}

/// DynamoDB AttributeValue マップから ToDo を復元
pub fn todo_from_item(map: &HashMap<String, AttributeValue>) -> Result<Todo, String> {
    let get_s = |name: &str| {
        map.get(name)
            .and_then(|v| v.as_s().ok())
            .ok_or_else(|| format!("Missing {name}"))
    };

    let id = TodoId::from_string(get_s("Id")?.clone()).map_err(|e| e.to_string())?;
    let title = get_s("Title")?.clone();
    let completed = *map
        .get("Completed")
        .and_then(|v| v.as_bool().ok())
        .ok_or("Missing Completed")?;
    let user_id = UserId::from_string(get_s("UserId")?.clone()).map_err(|e| e.to_string())?;
    let created_at = DateTime::parse_from_rfc3339(get_s("CreatedAt")?)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("Invalid CreatedAt: {e}"))?;

    Ok(Todo {
        id,
        title,
        completed,
        created_at,
        user_id,
    })
}
