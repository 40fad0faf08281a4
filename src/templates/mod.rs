//! Built-in diagram templates
//!
//! Seed content for new projects. Creating a project named "Default" seeds a
//! README plus one file per template; any other name seeds a single starter
//! file with the default content.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

const README: &str = "graph TD;\n    A[\"This sample project contains one diagram per built-in template.\"]\n    B[\"Create your own project to keep your diagrams separate.\"]\n    C[\"You can delete this sample project at any time and recreate it by creating a project named Default.\"]\n    D[\"Have fun!\"]\n    A --> B\n    A --> C\n    B --> D\n    C --> D";

const GRAPH: &str = "graph TD;\n    A[Create a project]-->B[Create a diagram];\n    B-->C[Copy diagram to clipboard];\n    B-->D[Export diagram as PNG];\n    C-->E[Happiness];\n    D-->E[Happiness];\n    A-->F[Export project];\n    F--Import project-->A";

const FLOWCHART: &str = "flowchart TD;\n    Start-->Decision{Keep going?};\n    Decision--Yes-->Work[Do the work];\n    Decision--No-->Stop;\n    Work-->Decision";

const SEQUENCE: &str = "sequenceDiagram;\n    A->>B: Hello B, how are you?\n    B->>A: I am good thanks!\n    A->>C: Hello C, how are you?\n    C->>A: I am good thanks!";

const CLASS: &str = "classDiagram\n    Animal <|-- Duck\n    Animal <|-- Fish\n    Animal : +int age\n    Animal : +isMammal()\n    class Duck{\n        +String beakColor\n        +swim()\n        +quack()\n    }\n    class Fish{\n        -int sizeInFeet\n        -canEat()\n    }";

const STATE: &str = "stateDiagram-v2\n    [*] --> State1\n    State1 --> [*]\n    State1 --> State2\n    State2 --> State1\n    State2 --> [*]";

const ERD: &str = "erDiagram\n    CUSTOMER ||--o{ ORDER : places\n    ORDER ||--|{ LINE-ITEM : contains\n    CUSTOMER }|..|{ DELIVERY-ADDRESS : uses";

const MINDMAP: &str = "mindmap\n  root\n    A\n      B\n    C\n      D\n      E\n    F\n      G\n      H";

const GIT_GRAPH: &str = "gitGraph\n    commit\n    branch develop\n    commit\n    branch feature\n    commit\n    checkout develop\n    merge feature\n    commit\n    checkout main\n    merge develop";

const USER_JOURNEY: &str = "journey\n    title My working day\n    section Go to work\n      Make tea: 5: Me\n      Go upstairs: 3: Me\n      Do work: 1: Me, Cat\n    section Go home\n      Go downstairs: 5: Me\n      Sit down: 5: Me";

const PIE_CHART: &str = "pie\n    title Pets adopted by volunteers\n    \"Dogs\": 386\n    \"Cats\": 85\n    \"Rats\": 15\n    \"Rabbits\": 15";

const GANTT: &str = "gantt\n    title A Gantt Diagram\n    dateFormat  YYYY-MM-DD\n    section A section\n    A task           :a1, 2014-01-01, 30d\n    Another task     :after a1  , 12d\n    section Critical tasks\n    Important task   :crit, 24d";

const TIMELINE: &str = "timeline\n    title History of Social Media Platform\n    2002 : LinkedIn\n    2004 : Facebook\n         : Google\n    2005 : Youtube\n    2006 : Twitter";

static TEMPLATES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("Graph", GRAPH),
        ("Flowchart", FLOWCHART),
        ("Sequence", SEQUENCE),
        ("Class", CLASS),
        ("State", STATE),
        ("ERD", ERD),
        ("Mindmap", MINDMAP),
        ("GitGraph", GIT_GRAPH),
        ("UserJourney", USER_JOURNEY),
        ("PieChart", PIE_CHART),
        ("Gantt", GANTT),
        ("Timeline", TIMELINE),
    ])
});

/// Name-keyed set of built-in diagram templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSet;

impl TemplateSet {
    pub fn new() -> Self {
        Self
    }

    /// Template content by name; unknown names fall back to the default.
    pub fn get(&self, name: &str) -> &'static str {
        TEMPLATES.get(name).copied().unwrap_or(GRAPH)
    }

    pub fn names(&self) -> Vec<&'static str> {
        TEMPLATES.keys().copied().collect()
    }

    /// Starter content for a newly created file.
    pub fn default_content(&self) -> &'static str {
        GRAPH
    }

    /// README seeded into the "Default" sample project.
    pub fn readme_content(&self) -> &'static str {
        README
    }
}
