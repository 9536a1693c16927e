use crate::scene::ObjectTag;

const MOON_INFO: &str = "\
The Moon is Earth's only natural satellite and the fifth largest in the Solar System. It formed about 4.51 billion years ago, likely from debris after a giant impact with a Mars-sized body called Theia.

The Moon is in synchronous rotation with Earth, always showing the same side. Its near side has dark volcanic maria and bright highlands, while the far side is heavily cratered. The Moon's gravitational influence drives Earth's tides and slowly lengthens the day.

The Moon's current distance from Earth allows it to appear almost the same size as the Sun, enabling total solar eclipses. It was first reached by the Soviet Union's Luna 2 in 1959, and the United States' Apollo program achieved the only manned missions, with six lunar landings between 1969 and 1972.

The Moon has no significant atmosphere, and its surface temperature varies widely. It has been a source of fascination and inspiration throughout history, featured in mythology, art, literature, and science.

Today, the Moon continues to be a target for exploration. Various space agencies and private companies plan missions, including crewed missions, robotic landers, and lunar bases. The Moon's resources, such as water ice, could be crucial for future space exploration and establishing a sustainable human presence beyond Earth.";

const PORTRAIT_INFO: &str = "\
My name is Nicolai, welcome to this portfolio! I am a software engineer with a passion for web development, computer graphics, and interactive experiences. I enjoy creating projects that combine technology, art, and storytelling to engage and inspire people.";

/// Annotation shown when `tag` is clicked, if it has one
pub fn text_for(tag: ObjectTag) -> Option<&'static str> {
    match tag {
        ObjectTag::Moon => Some(MOON_INFO),
        ObjectTag::Portrait => Some(PORTRAIT_INFO),
        ObjectTag::Torus | ObjectTag::Stars | ObjectTag::Grid | ObjectTag::Axes => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkable_objects_have_text() {
        assert!(text_for(ObjectTag::Moon).is_some_and(|t| t.contains("Theia")));
        assert!(text_for(ObjectTag::Portrait).is_some_and(|t| t.starts_with("My name is Nicolai")));
        assert!(text_for(ObjectTag::Torus).is_none());
    }
}
