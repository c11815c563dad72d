//! Demo catalogue that makes a fresh install useful without any uploads.

use crate::domain::{NewExercise, NewTest};
use crate::error::AppError;
use crate::store::Tables;

fn ex(title: &str, description: &str, content: &str, tags: &[&str]) -> NewExercise {
  NewExercise {
    title: title.into(),
    content: content.into(),
    description: Some(description.into()),
    tags: tags.iter().map(|t| t.to_string()).collect(),
  }
}

fn test(name: &str, description: &str, count: i32, tags: &[&str]) -> NewTest {
  NewTest {
    name: name.into(),
    description: Some(description.into()),
    exercise_count: count,
    tags: tags.iter().map(|t| t.to_string()).collect(),
  }
}

/// Built-in exercises, in insertion order.
pub fn seed_exercises() -> Vec<NewExercise> {
  vec![
    ex(
      "JavaScript Fundamentals",
      "Learn the basics of JavaScript programming language",
      "JavaScript is a versatile programming language that runs in browsers and servers. It supports dynamic typing, first-class functions, and prototype-based object-oriented programming. Key concepts include variables (var, let, const), functions, objects, arrays, and event handling. Modern JavaScript (ES6+) introduced features like arrow functions, template literals, destructuring, classes, modules, and async/await for handling asynchronous operations.",
      &["JavaScript", "Programming", "Web Development", "ES6", "Frontend"],
    ),
    ex(
      "React Component Lifecycle",
      "Understanding React component lifecycle methods and hooks",
      "React components have a lifecycle that includes mounting, updating, and unmounting phases. In class components, lifecycle methods like componentDidMount, componentDidUpdate, and componentWillUnmount manage these phases. With React Hooks, useEffect replaces these methods, allowing functional components to perform side effects. The useEffect hook can handle component mounting with empty dependency array, updates with specific dependencies, and cleanup with return functions.",
      &["React", "Frontend", "JavaScript", "Hooks", "Lifecycle"],
    ),
    ex(
      "RESTful API Design Principles",
      "Best practices for designing RESTful APIs",
      "REST (Representational State Transfer) is an architectural style for web services. Key principles include: stateless communication, uniform interface using HTTP methods (GET, POST, PUT, DELETE), resource identification through URIs, and representation through JSON or XML. Best practices include using proper HTTP status codes, implementing pagination for large datasets, versioning APIs, providing clear documentation, handling errors gracefully, and implementing proper authentication and authorization mechanisms.",
      &["REST", "API", "Backend", "HTTP", "Web Services"],
    ),
    ex(
      "SQL Database Normalization",
      "Database normalization forms and optimization techniques",
      "Database normalization is the process of organizing data to reduce redundancy and improve data integrity. First Normal Form (1NF) requires atomic values and unique rows. Second Normal Form (2NF) eliminates partial dependencies on composite keys. Third Normal Form (3NF) removes transitive dependencies. BCNF (Boyce-Codd Normal Form) handles anomalies in 3NF. Higher forms like 4NF and 5NF address multi-valued dependencies. Proper normalization improves data consistency, reduces storage space, and simplifies updates while potentially requiring more complex queries.",
      &["SQL", "Database", "Normalization", "Data Modeling", "RDBMS"],
    ),
    ex(
      "Git Version Control Workflow",
      "Git branching strategies and collaborative development",
      "Git is a distributed version control system that tracks changes in source code. Common workflows include Git Flow with feature, develop, and master branches, and GitHub Flow with feature branches and pull requests. Essential commands include git clone, add, commit, push, pull, merge, and rebase. Branching allows parallel development, while merging integrates changes. Conflict resolution requires manual intervention when changes overlap. Best practices include writing descriptive commit messages, using atomic commits, and regular synchronization with remote repositories.",
      &["Git", "Version Control", "Collaboration", "Branching", "DevOps"],
    ),
    ex(
      "Agile Software Development",
      "Agile methodologies and Scrum framework principles",
      "Agile software development emphasizes iterative development, collaboration, and adaptability. The Agile Manifesto values individuals over processes, working software over documentation, customer collaboration over contracts, and responding to change over following plans. Scrum is a popular Agile framework with roles (Product Owner, Scrum Master, Development Team), events (Sprint Planning, Daily Standups, Sprint Review, Retrospective), and artifacts (Product Backlog, Sprint Backlog, Increment). Sprints are time-boxed iterations typically lasting 1-4 weeks.",
      &["Agile", "Scrum", "Project Management", "Software Development", "Methodology"],
    ),
    ex(
      "CSS Grid and Flexbox Layout",
      "Modern CSS layout techniques for responsive design",
      "CSS Grid and Flexbox are powerful layout systems for modern web design. Flexbox excels at one-dimensional layouts (row or column) with properties like justify-content, align-items, and flex-grow. CSS Grid handles two-dimensional layouts with grid-template-columns, grid-template-rows, and grid-area. Both support responsive design through media queries and flexible units. Grid is ideal for page layouts, while Flexbox works well for component layouts. They can be combined for complex, responsive designs that adapt to different screen sizes and devices.",
      &["CSS", "Layout", "Grid", "Flexbox", "Responsive Design"],
    ),
    ex(
      "Microservices Architecture",
      "Design patterns and challenges in microservices systems",
      "Microservices architecture decomposes applications into small, independent services that communicate over networks. Benefits include scalability, technology diversity, fault isolation, and team autonomy. Challenges include distributed system complexity, network latency, data consistency, service discovery, and monitoring. Key patterns include API Gateway for routing, Circuit Breaker for fault tolerance, Event Sourcing for data management, and CQRS for read/write separation. Container orchestration with Docker and Kubernetes facilitates deployment and scaling.",
      &["Microservices", "Architecture", "Distributed Systems", "Docker", "Kubernetes"],
    ),
    ex(
      "Machine Learning Fundamentals",
      "Introduction to machine learning algorithms and concepts",
      "Machine Learning enables computers to learn patterns from data without explicit programming. Supervised learning uses labeled data for classification and regression tasks. Unsupervised learning finds patterns in unlabeled data through clustering and dimensionality reduction. Reinforcement learning learns through rewards and penalties. Common algorithms include linear regression, decision trees, neural networks, k-means clustering, and support vector machines. The ML pipeline involves data collection, preprocessing, feature engineering, model training, validation, and deployment.",
      &["Machine Learning", "AI", "Data Science", "Algorithms", "Python"],
    ),
    ex(
      "Software Testing Strategies",
      "Testing methodologies and quality assurance practices",
      "Software testing ensures application quality through various strategies. Unit tests validate individual components, integration tests verify component interactions, and end-to-end tests simulate user workflows. Test-Driven Development (TDD) writes tests before code, while Behavior-Driven Development (BDD) focuses on user stories. Testing pyramid suggests many unit tests, fewer integration tests, and minimal UI tests. Continuous Integration automates test execution. Tools include Jest for JavaScript, pytest for Python, and Selenium for browser automation.",
      &["Testing", "TDD", "BDD", "Quality Assurance", "Automation"],
    ),
  ]
}

/// Built-in tests as (definition, indices into `seed_exercises()` in practice order).
pub fn seed_tests() -> Vec<(NewTest, Vec<usize>)> {
  vec![
    (
      test("Frontend Development Fundamentals", "Test covering JavaScript, React, and CSS concepts", 3, &["Frontend", "JavaScript", "React", "CSS"]),
      vec![0, 1, 6],
    ),
    (
      test("Backend and Database Concepts", "Test covering REST APIs, databases, and server-side development", 2, &["Backend", "API", "Database", "SQL"]),
      vec![2, 3],
    ),
    (
      test("Software Engineering Practices", "Test covering development methodologies and best practices", 4, &["Software Engineering", "Testing", "Git", "Agile"]),
      vec![4, 5, 9, 7],
    ),
  ]
}

/// Fill an empty store. Stores that already hold exercises are left alone.
pub fn seed_tables(t: &mut Tables, with_defaults: bool, bank: Vec<NewExercise>) -> Result<usize, AppError> {
  if t.exercise_count() > 0 {
    return Ok(0);
  }
  let mut inserted = 0;
  if with_defaults {
    let mut created = Vec::new();
    for new in seed_exercises() {
      created.push(t.insert_exercise(new)?);
    }
    inserted += created.len();
    for (new, picks) in seed_tests() {
      let selected: Vec<_> = picks.iter().map(|&i| created[i].clone()).collect();
      t.insert_test(new, &selected)?;
    }
  }
  for new in bank {
    t.insert_exercise(new)?;
    inserted += 1;
  }
  Ok(inserted)
}
