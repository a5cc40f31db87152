use std::path::PathBuf;

pub enum Command {
    // Collections management
    ColCreate {
        name: String,
    },
    ColDrop {
        name: String,
    },
    ColList,
    ColRename {
        old: String,
        new: String,
    },
    Import {
        collection: String,
        file: PathBuf,
        format: Option<String>,
    },
    // Document creation
    Insert {
        collection: String,
        json: String,
    },
    // Query subcommands (programmatic)
    Find {
        collection: String,
        filter_json: String,
        project_json: Option<String>,
        sort_json: Option<String>,
        limit: Option<usize>,
        skip: Option<usize>,
    },
    Count {
        collection: String,
        filter_json: String,
    },
    UpdateOne {
        collection: String,
        filter_json: String,
        update_json: String,
    },
    UpdateMany {
        collection: String,
        filter_json: String,
        update_json: String,
    },
    DeleteOne {
        collection: String,
        filter_json: String,
    },
    DeleteMany {
        collection: String,
        filter_json: String,
    },
    Explain {
        collection: String,
        filter_json: String,
        sort_json: Option<String>,
        limit: Option<usize>,
        skip: Option<usize>,
    },
    // Aggregation
    Aggregate {
        collection: String,
        pipeline_json: String,
    },
    // Index admin
    IndexCreate {
        collection: String,
        keys_json: String,
        kind: Option<String>,
    },
    IndexDrop {
        collection: String,
        name: String,
    },
    IndexList {
        collection: String,
    },
    // Maintenance
    Compact,
}
