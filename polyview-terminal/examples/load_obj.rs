/// Example: Load and render an OBJ file in the terminal
///
/// Usage: cargo run --example load_obj -- path/to/model.obj

use std::env;
use std::io;

use polyview_core::{load_obj, ObjOptions, Polyhedron, SceneConfig};
use polyview_terminal::{PresentMode, TerminalApp};

fn main() -> io::Result<()> {
    let args: Vec<String> = env::args().collect();

    let model = match args.get(1) {
        Some(path) => {
            println!("Loading OBJ file: {}", path);
            let model = load_obj(path, ObjOptions::default())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
            println!("Loaded {} faces", model.faces.len());
            model
        }
        None => {
            eprintln!("Usage: {} <obj-file>", args[0]);
            eprintln!("\nNo OBJ file provided, using default cube...");
            Polyhedron::cube(2.0)
        }
    };

    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    let mut app = TerminalApp::new(model, &SceneConfig::default(), PresentMode::TrueColor)?;
    app.run()
}
