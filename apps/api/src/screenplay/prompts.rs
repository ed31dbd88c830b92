// LLM prompt templates for screenplay generation and the cover image.
// Placeholders are substituted by `prompt_builder`; values are escaped first.

/// Screenplay prompt template.
/// Replace: {theme}, {story_summary}, {number_of_characters}, {characters}, {props},
///          {vfx}, {drones}, {location}, {scene_rule}, {shot_rule}, {json_rules}
pub const SCREENPLAY_PROMPT_TEMPLATE: &str = r#"Generate a short 3-4 minute screenplay for a children's short film based on the following details. The output screenplay must be formatted as a JSON object.
<input>
Theme: {theme}
Story Summary: {story_summary}
Number of Characters: {number_of_characters}
Characters: {characters}
Props: {props}
VFX: {vfx}
Drones: {drones}
Location: {location}
</input>

<guidelines>
The JSON output must follow this EXACT schema. Use {scene_rule} (scene_number), and {shot_rule} (shot_number). Keep spoken lines short and concise, one list entry per line of dialogue.
{
    "title": "Title of the screenplay",
    "synopsis": "3 to 4 sentence synopsis of the screenplay",
    "characters": "Characters in the screenplay, their names (if provided), and a description of their roles",
    "suggested_props_wardrobe": "Comma-separated props and wardrobe we suggest for this screenplay",
    "custom_props": "Comma-separated props from the input details that the screenplay uses",
    "scenes": [
        {
            "scene_number": 1,
            "scene_breakdown": "Breakdown of the scene, including location, characters, props, and what's happening",
            "scene_props": "Comma-separated props needed for this scene",
            "shots": [
                {
                    "shot_number": 1,
                    "shot_description": "Description of the shot, including camera movement and character tips",
                    "spoken_lines": [
                        "Character 1: (stage direction) line of dialogue",
                        "Character 2: (stage direction) line of dialogue"
                    ]
                }
            ]
        }
    ]
}

An example of a title is:
    Knights of the Round Table
An example of a synopsis is:
    A whimsical adventure where cardboard swords meet courageous hearts! Join our tiny knights as they face dragons, solve puzzles, and navigate magical corridors to reclaim their stolen crown.
An example of characters is:
    John - Hero: A young knight in homemade armor with a cardboard sword\nAnna - Friend: A brave girl in a pink dress who solves every riddle\nDragon - Villain: A huge red and orange dragon with fire powers
An example of a scene_breakdown is:
    INT. FAMILY LIVING ROOM - DAY\nThe living room has been transformed into a castle, with towers made of cardboard and a round table crafted on an ottoman. The knights stand around the table, each holding a cardboard sword.
An example of scene_props is:
    Sword, Dress, Round Table
An example of a shot_description is:
    Wide shot to establish the imaginative setting
An example of spoken_lines is:
    ["John: (placing his sword over the table) Knights of the Round Table, our quest begins!", "Anna: (pumping her fist) We shall retrieve our lost crown!"]

{json_rules}
</guidelines>"#;

/// Cover image prompt template.
/// Replace: {theme}, {title}, {story_summary}, {characters}
pub const COVER_IMAGE_PROMPT_TEMPLATE: &str = "Make a {theme} movie poster for the following \
screenplay, in the style of a {theme} theme film (not a cartoon). \
Title: {title}. \
Synopsis: {story_summary}. \
Characters: {characters}. \
Highlight the theme of the screenplay. NEVER PUT TEXT ON THE MOVIE POSTER.";
